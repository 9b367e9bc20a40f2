/// GraphicsDevice trait - device, queue, command allocator/list and fence

use crate::error::Result;
use crate::graphics_device::{
    CommandList, DescriptorHeap, DescriptorHeapType, Swapchain, Texture, TextureFormat,
};

/// Swapchain creation parameters
///
/// `width == 0 && height == 0` means "match the window client area".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub width: u32,
    pub height: u32,
    /// Requested buffer count (the backend may create more)
    pub buffer_count: u32,
    pub format: TextureFormat,
    /// 0 presents immediately, 1 waits for vertical blank
    pub sync_interval: u32,
}

impl SwapchainDesc {
    pub fn matches_window(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// Depth/stencil texture creation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Optimized clear value
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

/// A GPU device together with its direct queue, one command allocator, one
/// command list and one monotonically increasing fence
///
/// Backends create the command list closed. Fence values are chosen by the
/// caller; the device only signals and reports them.
pub trait GraphicsDevice: Send {
    /// Create the swapchain for the window this device was created against
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>>;

    /// Create a CPU-side descriptor heap for render-target or depth-stencil views
    fn create_descriptor_heap(
        &mut self,
        heap_type: DescriptorHeapType,
        capacity: u32,
    ) -> Result<Box<dyn DescriptorHeap>>;

    /// Create a depth/stencil texture in the `Common` state
    fn create_depth_stencil(&mut self, desc: &DepthStencilDesc) -> Result<Box<dyn Texture>>;

    /// The device's single command list
    fn command_list(&mut self) -> &mut dyn CommandList;

    /// Submit the (closed) command list to the direct queue
    fn execute_command_list(&mut self) -> Result<()>;

    /// Enqueue a fence signal of `value` on the direct queue
    fn signal(&mut self, value: u64) -> Result<()>;

    /// Last fence value the GPU has reached
    fn completed_value(&self) -> Result<u64>;

    /// Block the calling thread until the fence reaches `value`
    fn wait_for_value(&mut self, value: u64) -> Result<()>;

    /// Human-readable adapter name
    fn adapter_name(&self) -> String;
}
