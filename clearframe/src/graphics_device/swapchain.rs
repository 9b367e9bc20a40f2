/// Swapchain trait - flip-model presentation to a window

use crate::error::Result;
use crate::graphics_device::{Texture, TextureFormat};

/// Swapchain for presenting color buffers to a window
///
/// Buffers are created in the `Common` state and owned by the swapchain.
pub trait Swapchain: Send {
    /// Number of color buffers actually created
    fn buffer_count(&self) -> u32;

    /// Color buffer at `index`
    fn buffer(&self, index: u32) -> Result<&dyn Texture>;

    /// Wait until the presentation engine hands back a buffer, and return its index
    fn acquire_next_buffer(&mut self) -> Result<u32>;

    /// Queue the buffer at `index` for presentation
    ///
    /// Presentation happens after all previously submitted GPU work.
    fn present(&mut self, index: u32) -> Result<()>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;
}
