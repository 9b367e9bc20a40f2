/*!
# Clearframe - Vulkan Backend

Vulkan implementation of the `clearframe` graphics-device traits, using the
Ash library for Vulkan bindings and gpu-allocator for memory management.

Requires Vulkan 1.3 (dynamic rendering and timeline semaphores).

# Example

```no_run
use clearframe::cf::{Config, Renderer};
use clearframe_renderer_vulkan::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> clearframe::cf::Result<()> {
let config = Config::default();
let device = VulkanGraphicsDevice::new(window, config.clone())?;

let mut renderer = Renderer::new(&config);
renderer.initialize(Box::new(device), &config)?;
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_context;
mod vulkan_format;
mod vulkan_texture;
mod vulkan_descriptor_heap;
mod vulkan_command_list;
mod vulkan_swapchain;
mod debug;

pub use vulkan::VulkanGraphicsDevice;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};
