/// Texture - Vulkan implementation of the engine Texture trait
///
/// Two flavors: swapchain images (owned by the swapchain, never destroyed
/// here) and allocated images such as the depth/stencil buffer.

use ash::vk;
use ash::vk::Handle;
use clearframe::cf::render::{ResourceHandle, Texture as RendererTexture, TextureInfo};
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan texture implementation
pub struct Texture {
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// GPU memory allocation (None for swapchain images)
    pub(crate) allocation: Option<Allocation>,
    /// Shared GPU context (for cleanup of owned images)
    pub(crate) gpu_context: Option<Arc<GpuContext>>,
    /// Read-only texture properties
    pub(crate) info: TextureInfo,
}

impl Texture {
    /// Wrap an image owned by a swapchain
    pub(crate) fn from_swapchain_image(image: vk::Image, info: TextureInfo) -> Self {
        Self {
            image,
            allocation: None,
            gpu_context: None,
            info,
        }
    }

    /// Take ownership of an allocated image
    pub(crate) fn from_allocation(
        image: vk::Image,
        allocation: Allocation,
        gpu_context: Arc<GpuContext>,
        info: TextureInfo,
    ) -> Self {
        Self {
            image,
            allocation: Some(allocation),
            gpu_context: Some(gpu_context),
            info,
        }
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn handle(&self) -> ResourceHandle {
        ResourceHandle(self.image.as_raw())
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let Some(ctx) = self.gpu_context.take() else {
            return;
        };
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy image
            ctx.device.destroy_image(self.image, None);
        }
    }
}
