/// Swapchain - Vulkan implementation of the engine Swapchain trait
///
/// Acquire is synchronized on the host (a fence), so the frame's command list
/// does not need to wait on an acquire semaphore. Present waits on a per-image
/// semaphore signaled by an empty submission queued after the frame's work.

use ash::vk;
use clearframe::cf::render::{
    Swapchain as RendererSwapchain, SwapchainDesc, Texture as RendererTexture, TextureFormat,
    TextureInfo,
};
use clearframe::cf::{Error, Result};
use clearframe::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    choose_extent, choose_present_mode, choose_surface_format, clamp_image_count, format_to_vk,
    vk_to_format,
};
use crate::vulkan_texture::Texture;

/// Vulkan swapchain implementation
pub struct Swapchain {
    gpu_context: Arc<GpuContext>,

    /// Swapchain
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    /// One texture per swapchain image (images are owned by the swapchain)
    buffers: Vec<Texture>,
    format: TextureFormat,
    extent: vk::Extent2D,

    /// Signaled by vkAcquireNextImageKHR, waited on by the host
    acquire_fence: vk::Fence,
    /// One semaphore per swapchain image (for present)
    present_semaphores: Vec<vk::Semaphore>,
}

impl Swapchain {
    /// Create a new swapchain
    ///
    /// # Arguments
    ///
    /// * `gpu_context` - Shared GPU context
    /// * `surface_loader` - Surface loader
    /// * `physical_device` - Physical device for capabilities queries
    /// * `surface` - Window surface (owned by the device)
    /// * `window_size` - Window client size, used when the surface does not dictate an extent
    /// * `desc` - Requested size, buffer count, format and sync interval
    pub(crate) fn new(
        gpu_context: Arc<GpuContext>,
        surface_loader: &ash::khr::surface::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        window_size: (u32, u32),
        desc: &SwapchainDesc,
    ) -> Result<Self> {
        unsafe {
            let surface_capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;

            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to query present modes: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
                })?;

            let requested_format = format_to_vk(desc.format);
            let surface_format = choose_surface_format(requested_format, &surface_formats).ok_or_else(|| {
                engine_error!("clearframe::vulkan", "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;
            let format = vk_to_format(surface_format.format).ok_or_else(|| {
                engine_error!("clearframe::vulkan", "Unsupported surface format {:?}", surface_format.format);
                Error::InitializationFailed(format!("Unsupported surface format {:?}", surface_format.format))
            })?;
            if surface_format.format != requested_format {
                engine_warn!(
                    "clearframe::vulkan",
                    "Surface does not support {:?}, using {:?}",
                    desc.format, format
                );
            }

            let extent = choose_extent((desc.width, desc.height), window_size, &surface_capabilities);
            let image_count = clamp_image_count(desc.buffer_count, &surface_capabilities);
            let present_mode = choose_present_mode(desc.sync_interval, &present_modes);

            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(surface_capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true);

            let swapchain_loader = ash::khr::swapchain::Device::new(&gpu_context.instance, &gpu_context.device);
            let swapchain = swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            // From here on, Drop cleans up whatever has been created
            let mut this = Self {
                gpu_context,
                swapchain,
                swapchain_loader,
                buffers: Vec::new(),
                format,
                extent,
                acquire_fence: vk::Fence::null(),
                present_semaphores: Vec::new(),
            };

            let images = this
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            let info = TextureInfo {
                width: extent.width,
                height: extent.height,
                format,
                clear_value: None,
            };
            this.buffers = images
                .into_iter()
                .map(|image| Texture::from_swapchain_image(image, info))
                .collect();

            this.acquire_fence = this
                .gpu_context
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to create acquire fence: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                })?;

            let semaphore_create_info = vk::SemaphoreCreateInfo::default();
            for _ in 0..this.buffers.len() {
                let semaphore = this
                    .gpu_context
                    .device
                    .create_semaphore(&semaphore_create_info, None)
                    .map_err(|e| {
                        engine_error!("clearframe::vulkan", "Failed to create present semaphore: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?;
                this.present_semaphores.push(semaphore);
            }

            engine_info!(
                "clearframe::vulkan",
                "Swapchain created: {}x{}, {} images, {:?}, {:?}",
                extent.width, extent.height, this.buffers.len(), format, present_mode
            );

            Ok(this)
        }
    }
}

impl RendererSwapchain for Swapchain {
    fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn buffer(&self, index: u32) -> Result<&dyn RendererTexture> {
        self.buffers
            .get(index as usize)
            .map(|texture| texture as &dyn RendererTexture)
            .ok_or_else(|| {
                Error::InvalidResource(format!(
                    "swapchain buffer {} out of range (count: {})",
                    index,
                    self.buffers.len()
                ))
            })
    }

    fn acquire_next_buffer(&mut self) -> Result<u32> {
        unsafe {
            let (image_index, is_suboptimal) = self
                .swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, vk::Semaphore::null(), self.acquire_fence)
                .map_err(|e| {
                    if e == vk::Result::ERROR_OUT_OF_DATE_KHR {
                        engine_err!("clearframe::vulkan", "Swapchain out of date during acquire")
                    } else {
                        engine_err!("clearframe::vulkan", "Failed to acquire next swapchain image: {:?}", e)
                    }
                })?;

            if is_suboptimal {
                engine_debug!("clearframe::vulkan", "Swapchain is suboptimal for the surface");
            }

            let device = &self.gpu_context.device;
            device
                .wait_for_fences(&[self.acquire_fence], true, u64::MAX)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to wait for acquire fence: {:?}", e))?;
            device
                .reset_fences(&[self.acquire_fence])
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to reset acquire fence: {:?}", e))?;

            Ok(image_index)
        }
    }

    fn present(&mut self, index: u32) -> Result<()> {
        if index as usize >= self.buffers.len() {
            engine_bail!(
                "clearframe::vulkan",
                "present: image index {} out of range (count: {})",
                index,
                self.buffers.len()
            );
        }

        let semaphores = [self.present_semaphores[index as usize]];
        let swapchains = [self.swapchain];
        let image_indices = [index];

        unsafe {
            // Semaphore signal operations cover all work submitted before them
            let signal_info = vk::SubmitInfo::default().signal_semaphores(&semaphores);
            self.gpu_context
                .device
                .queue_submit(self.gpu_context.graphics_queue, &[signal_info], vk::Fence::null())
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to signal present semaphore: {:?}", e))?;

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            let is_suboptimal = self
                .swapchain_loader
                .queue_present(self.gpu_context.graphics_queue, &present_info)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to present swapchain image {}: {:?}", index, e))?;

            if is_suboptimal {
                engine_debug!("clearframe::vulkan", "Swapchain is suboptimal for the surface");
            }
        }
        Ok(())
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            let device = &self.gpu_context.device;

            // Present semaphores may still be pending
            device.device_wait_idle().ok();

            for &semaphore in &self.present_semaphores {
                device.destroy_semaphore(semaphore, None);
            }
            if self.acquire_fence != vk::Fence::null() {
                device.destroy_fence(self.acquire_fence, None);
            }

            // Swapchain images go with the swapchain
            self.buffers.clear();
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
