/// Graphics device module - the trait seam between the renderer and a GPU backend

pub mod graphics_device;
pub mod texture;
pub mod command_list;
pub mod descriptor_heap;
pub mod swapchain;

pub use graphics_device::*;
pub use texture::*;
pub use command_list::*;
pub use descriptor_heap::*;
pub use swapchain::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
