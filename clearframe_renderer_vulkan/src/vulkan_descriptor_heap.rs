/// DescriptorHeap - Vulkan implementation of the engine DescriptorHeap trait
///
/// Vulkan has no RTV/DSV heaps: a "view" is a `VkImageView`, and the
/// descriptor handle carries its raw value. Every view is also recorded in a
/// registry shared with the command list, which needs the extent and format
/// behind a handle to clear it or begin rendering into it.

use ash::vk;
use ash::vk::Handle;
use clearframe::cf::render::{
    DescriptorHandle, DescriptorHeap as RendererDescriptorHeap, DescriptorHeapType,
    Texture as RendererTexture, TextureFormat,
};
use clearframe::cf::{Error, Result};
use clearframe::engine_err;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{aspect_mask, format_to_vk};

/// What the command list needs to know about a view
#[derive(Debug, Clone, Copy)]
pub(crate) struct ViewInfo {
    pub extent: vk::Extent2D,
    pub format: TextureFormat,
}

/// Image views by raw handle, shared between heaps and the command list
pub(crate) type ViewRegistry = Arc<Mutex<FxHashMap<u64, ViewInfo>>>;

/// Vulkan descriptor heap: a fixed number of image-view slots
pub struct DescriptorHeap {
    heap_type: DescriptorHeapType,
    views: Vec<Option<vk::ImageView>>,
    registry: ViewRegistry,
    gpu_context: Arc<GpuContext>,
}

impl DescriptorHeap {
    pub(crate) fn new(
        heap_type: DescriptorHeapType,
        capacity: u32,
        registry: ViewRegistry,
        gpu_context: Arc<GpuContext>,
    ) -> Self {
        Self {
            heap_type,
            views: vec![None; capacity as usize],
            registry,
            gpu_context,
        }
    }

    fn handle_for(&self, index: u32, view: vk::ImageView) -> DescriptorHandle {
        DescriptorHandle {
            heap_type: self.heap_type,
            index,
            raw: view.as_raw(),
        }
    }

    fn release(&self, view: vk::ImageView) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(&view.as_raw());
        }
        unsafe {
            self.gpu_context.device.destroy_image_view(view, None);
        }
    }
}

impl RendererDescriptorHeap for DescriptorHeap {
    fn heap_type(&self) -> DescriptorHeapType {
        self.heap_type
    }

    fn capacity(&self) -> u32 {
        self.views.len() as u32
    }

    fn create_view(&mut self, index: u32, texture: &dyn RendererTexture) -> Result<DescriptorHandle> {
        if index as usize >= self.views.len() {
            return Err(Error::InvalidResource(format!(
                "descriptor index {} out of range (capacity: {})",
                index,
                self.views.len()
            )));
        }

        let info = *texture.info();
        let expects_depth = self.heap_type == DescriptorHeapType::Dsv;
        if info.format.is_depth() != expects_depth {
            return Err(Error::InvalidResource(format!(
                "{:?} view cannot target a {:?} texture",
                self.heap_type, info.format
            )));
        }

        let image = vk::Image::from_raw(texture.handle().0);
        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(info.format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_mask(info.format),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe {
            self.gpu_context
                .device
                .create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to create {:?} image view: {:?}", self.heap_type, e))?
        };

        // Replacing a slot releases the previous view
        if let Some(previous) = self.views[index as usize].take() {
            self.release(previous);
        }
        self.views[index as usize] = Some(view);

        self.registry
            .lock()
            .map_err(|_| engine_err!("clearframe::vulkan", "View registry lock poisoned"))?
            .insert(
                view.as_raw(),
                ViewInfo {
                    extent: vk::Extent2D { width: info.width, height: info.height },
                    format: info.format,
                },
            );

        Ok(self.handle_for(index, view))
    }

    fn handle(&self, index: u32) -> Option<DescriptorHandle> {
        self.views
            .get(index as usize)
            .copied()
            .flatten()
            .map(|view| self.handle_for(index, view))
    }
}

impl Drop for DescriptorHeap {
    fn drop(&mut self) {
        let views: Vec<vk::ImageView> = self.views.iter_mut().filter_map(Option::take).collect();
        for view in views {
            self.release(view);
        }
    }
}
