/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait

use ash::vk;
use clearframe::cf::render::{
    ClearValue, CommandList as RendererCommandList, DepthStencilDesc,
    DescriptorHeap as RendererDescriptorHeap, DescriptorHeapType, GraphicsDevice,
    Swapchain as RendererSwapchain, SwapchainDesc, Texture as RendererTexture, TextureFormat,
    TextureInfo,
};
use clearframe::cf::{Config, Error, Result};
use clearframe::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use winit::window::Window;

use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_heap::{DescriptorHeap, ViewRegistry};
use crate::vulkan_format::{depth_format_candidates, format_to_vk};
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::Texture;

/// Vulkan graphics device
///
/// One graphics queue (also used for present), one command list, and a
/// timeline semaphore standing in for the monotonic fence. Requires
/// Vulkan 1.3 for dynamic rendering.
pub struct VulkanGraphicsDevice {
    /// Vulkan entry (keeps the loader alive)
    _entry: ash::Entry,
    /// Vulkan instance (shared with GpuContext, destroyed here)
    instance: ash::Instance,
    /// Physical device
    physical_device: vk::PhysicalDevice,
    adapter_name: String,

    /// Window surface, created up front for queue selection
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    window_size: (u32, u32),
    swapchain_created: bool,

    /// GPU memory allocator reference (stored in GpuContext)
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Timeline semaphore used as the fence
    fence: vk::Semaphore,

    /// The single command list (dropped explicitly before the device)
    command_list: ManuallyDrop<CommandList>,
    views: ViewRegistry,

    /// Shared GPU context for all resources
    gpu_context: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create a new Vulkan device for a window
    ///
    /// # Arguments
    ///
    /// * `window` - Window for surface creation
    /// * `config` - Renderer configuration
    pub fn new(window: &Window, config: Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("clearframe::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.clone()).unwrap_or_default();
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Clearframe")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("clearframe::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            // Validation needs both the cargo feature and the runtime switch
            let enable_validation = cfg!(feature = "vulkan-validation") && config.enable_validation;
            if config.enable_validation && !enable_validation {
                engine_warn!(
                    "clearframe::vulkan",
                    "Validation requested but the vulkan-validation feature is disabled"
                );
            }

            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let sync_features = [vk::ValidationFeatureEnableEXT::SYNCHRONIZATION_VALIDATION];
            let mut validation_features =
                vk::ValidationFeaturesEXT::default().enabled_validation_features(&sync_features);

            let mut create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            if enable_validation && config.sync_validation {
                create_info = create_info.push_next(&mut validation_features);
            }

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("clearframe::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            // Setup debug messenger if validation is enabled
            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

                crate::debug::init_debug_config(crate::debug::Config {
                    severity: config.debug_severity,
                    output: config.debug_output.clone(),
                    message_filter: config.debug_message_filter,
                    break_on_error: config.break_on_validation_error,
                });

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        instance.destroy_instance(None);
                        engine_error!("clearframe::vulkan", "Failed to create debug messenger: {:?}", e);
                        return Err(Error::InitializationFailed(format!(
                            "Failed to create debug messenger: {:?}",
                            e
                        )));
                    }
                }
            } else {
                (None, None)
            };

            // Everything created from here is released by the cleanup guard on failure
            let mut partial = PartialInit {
                instance: &instance,
                debug_utils_loader: debug_utils_loader.as_ref(),
                debug_messenger,
                surface_loader: ash::khr::surface::Instance::new(&entry, &instance),
                surface: vk::SurfaceKHR::null(),
                device: None,
            };

            let window_handle = window.window_handle().map_err(|e| {
                engine_error!("clearframe::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            partial.surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("clearframe::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let (physical_device, queue_family, adapter_name) =
                Self::pick_physical_device(&instance, &partial.surface_loader, partial.surface)?;

            // Logical device with timeline semaphores (1.2) and dynamic rendering (1.3)
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let mut features_12 = vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);
            let mut features_13 = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut features_12)
                .push_next(&mut features_13);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;
            partial.device = Some(device.clone());

            let graphics_queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("clearframe::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let mut semaphore_type_info = vk::SemaphoreTypeCreateInfo::default()
                .semaphore_type(vk::SemaphoreType::TIMELINE)
                .initial_value(0);
            let semaphore_create_info = vk::SemaphoreCreateInfo::default().push_next(&mut semaphore_type_info);
            let fence = device.create_semaphore(&semaphore_create_info, None).map_err(|e| {
                engine_error!("clearframe::vulkan", "Failed to create timeline semaphore: {:?}", e);
                Error::InitializationFailed(format!("Failed to create timeline semaphore: {:?}", e))
            })?;

            // Nothing below can fail without the context owning the device
            let surface = partial.surface;
            let surface_loader = partial.surface_loader.clone();
            std::mem::forget(partial);

            let allocator_arc = Arc::new(Mutex::new(allocator));
            let gpu_context = Arc::new(GpuContext::new(
                device.clone(),
                Arc::clone(&allocator_arc),
                graphics_queue,
                queue_family,
                instance.clone(),
                debug_utils_loader,
                debug_messenger,
            ));

            let views: ViewRegistry = Arc::new(Mutex::new(FxHashMap::default()));
            let command_list = match CommandList::new(Arc::clone(&gpu_context), Arc::clone(&views)) {
                Ok(list) => list,
                Err(e) => {
                    device.destroy_semaphore(fence, None);
                    drop(allocator_arc);
                    if let Some(mut ctx) = Arc::into_inner(gpu_context) {
                        ManuallyDrop::drop(&mut ctx.allocator);
                        crate::debug::cleanup_debug_config();
                        if let (Some(debug_utils), Some(messenger)) =
                            (&ctx.debug_utils_loader, ctx.debug_messenger)
                        {
                            debug_utils.destroy_debug_utils_messenger(messenger, None);
                        }
                    }
                    device.destroy_device(None);
                    surface_loader.destroy_surface(surface, None);
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            let size = window.inner_size();

            engine_info!(
                "clearframe::vulkan",
                "Vulkan device created on {} (validation: {})",
                adapter_name, enable_validation
            );

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                adapter_name,
                surface,
                surface_loader,
                window_size: (size.width, size.height),
                swapchain_created: false,
                allocator: ManuallyDrop::new(allocator_arc),
                fence,
                command_list: ManuallyDrop::new(command_list),
                views,
                gpu_context,
            })
        }
    }

    /// Pick the adapter: Vulkan 1.3 with one queue family that can both draw and
    /// present to `surface`, discrete GPUs first
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, String)> {
        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("clearframe::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        let mut best: Option<(u32, vk::PhysicalDevice, u32, String)> = None;
        for physical_device in physical_devices {
            let properties = instance.get_physical_device_properties(physical_device);
            let name = properties
                .device_name_as_c_str()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "Unknown adapter".to_string());

            if properties.api_version < vk::API_VERSION_1_3 {
                engine_debug!("clearframe::vulkan", "Skipping {}: Vulkan 1.3 not supported", name);
                continue;
            }

            let mut features_12 = vk::PhysicalDeviceVulkan12Features::default();
            let mut features_13 = vk::PhysicalDeviceVulkan13Features::default();
            let mut features = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut features_12)
                .push_next(&mut features_13);
            instance.get_physical_device_features2(physical_device, &mut features);
            if features_12.timeline_semaphore == vk::FALSE || features_13.dynamic_rendering == vk::FALSE {
                engine_debug!("clearframe::vulkan", "Skipping {}: missing required features", name);
                continue;
            }

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let queue_family = (0..queue_families.len() as u32).find(|&i| {
                queue_families[i as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                    && surface_loader
                        .get_physical_device_surface_support(physical_device, i, surface)
                        .unwrap_or(false)
            });
            let Some(queue_family) = queue_family else {
                engine_debug!("clearframe::vulkan", "Skipping {}: no graphics+present queue", name);
                continue;
            };

            let score = match properties.device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 3,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
                vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
                _ => 0,
            };
            if best.as_ref().map_or(true, |(s, ..)| score > *s) {
                best = Some((score, physical_device, queue_family, name));
            }
        }

        best.map(|(_, physical_device, queue_family, name)| (physical_device, queue_family, name))
            .ok_or_else(|| {
                engine_error!("clearframe::vulkan", "No suitable Vulkan 1.3 GPU found");
                Error::InitializationFailed("No suitable Vulkan 1.3 GPU found".to_string())
            })
    }

    /// First depth format with optimal-tiling attachment support
    fn pick_depth_format(&self, requested: TextureFormat) -> Result<TextureFormat> {
        for candidate in depth_format_candidates(requested) {
            let properties = unsafe {
                self.instance
                    .get_physical_device_format_properties(self.physical_device, format_to_vk(candidate))
            };
            if properties
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            {
                if candidate != requested {
                    engine_warn!(
                        "clearframe::vulkan",
                        "Depth format {:?} unsupported, falling back to {:?}",
                        requested, candidate
                    );
                }
                return Ok(candidate);
            }
        }
        Err(Error::InitializationFailed(format!(
            "No supported depth format (requested {:?})",
            requested
        )))
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn RendererSwapchain>> {
        if self.swapchain_created {
            return Err(Error::InvalidState("the window surface already has a swapchain".to_string()));
        }

        let swapchain = Swapchain::new(
            Arc::clone(&self.gpu_context),
            &self.surface_loader,
            self.physical_device,
            self.surface,
            self.window_size,
            desc,
        )?;
        self.swapchain_created = true;
        Ok(Box::new(swapchain))
    }

    fn create_descriptor_heap(
        &mut self,
        heap_type: DescriptorHeapType,
        capacity: u32,
    ) -> Result<Box<dyn RendererDescriptorHeap>> {
        if capacity == 0 {
            return Err(Error::InvalidResource("descriptor heap capacity must be > 0".to_string()));
        }
        Ok(Box::new(DescriptorHeap::new(
            heap_type,
            capacity,
            Arc::clone(&self.views),
            Arc::clone(&self.gpu_context),
        )))
    }

    fn create_depth_stencil(&mut self, desc: &DepthStencilDesc) -> Result<Box<dyn RendererTexture>> {
        if !desc.format.is_depth() {
            engine_bail!("clearframe::vulkan", "create_depth_stencil: {:?} is not a depth format", desc.format);
        }
        let format = self.pick_depth_format(desc.format)?;
        let device = &self.gpu_context.device;

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format_to_vk(format))
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device
                .create_image(&image_create_info, None)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to create depth image: {:?}", e))?;

            let requirements = device.get_image_memory_requirements(image);
            let allocation = self
                .allocator
                .lock()
                .map_err(|_| engine_err!("clearframe::vulkan", "Allocator lock poisoned"))
                .and_then(|mut allocator| {
                    allocator
                        .allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                            name: "depth_stencil",
                            requirements,
                            location: gpu_allocator::MemoryLocation::GpuOnly,
                            linear: false,
                            allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
                        })
                        .map_err(|_e| {
                            let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                            engine_error!(
                                "clearframe::vulkan",
                                "Out of GPU memory for depth buffer ({}x{}, {:.2} MB)",
                                desc.width, desc.height, size_mb
                            );
                            Error::OutOfMemory
                        })
                });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            let info = TextureInfo {
                width: desc.width,
                height: desc.height,
                format,
                clear_value: Some(ClearValue::DepthStencil {
                    depth: desc.clear_depth,
                    stencil: desc.clear_stencil,
                }),
            };

            if let Err(e) = device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                // The texture frees the allocation and destroys the image
                drop(Texture::from_allocation(image, allocation, Arc::clone(&self.gpu_context), info));
                engine_bail!("clearframe::vulkan", "Failed to bind depth image memory: {:?}", e);
            }

            Ok(Box::new(Texture::from_allocation(image, allocation, Arc::clone(&self.gpu_context), info)))
        }
    }

    fn command_list(&mut self) -> &mut dyn RendererCommandList {
        &mut *self.command_list
    }

    fn execute_command_list(&mut self) -> Result<()> {
        if self.command_list.is_recording() {
            return Err(Error::InvalidState("execute_command_list: command list is still open".to_string()));
        }

        let command_buffers = [self.command_list.command_buffer()];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        unsafe {
            self.gpu_context
                .device
                .queue_submit(self.gpu_context.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to submit commands to GPU queue: {:?}", e))
        }
    }

    fn signal(&mut self, value: u64) -> Result<()> {
        let semaphores = [self.fence];
        let values = [value];
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&values);
        let submit_info = vk::SubmitInfo::default()
            .signal_semaphores(&semaphores)
            .push_next(&mut timeline_info);

        unsafe {
            self.gpu_context
                .device
                .queue_submit(self.gpu_context.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to signal fence value {}: {:?}", value, e))
        }
    }

    fn completed_value(&self) -> Result<u64> {
        unsafe {
            self.gpu_context
                .device
                .get_semaphore_counter_value(self.fence)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to read fence value: {:?}", e))
        }
    }

    fn wait_for_value(&mut self, value: u64) -> Result<()> {
        let semaphores = [self.fence];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);

        unsafe {
            self.gpu_context
                .device
                .wait_semaphores(&wait_info, u64::MAX)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to wait for fence value {}: {:?}", value, e))
        }
    }

    fn adapter_name(&self) -> String {
        self.adapter_name.clone()
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            let device = self.gpu_context.device.clone();

            // Wait for device to finish
            device.device_wait_idle().ok();

            // 1. Command list: destroys its pool and releases its Arc<GpuContext>
            ManuallyDrop::drop(&mut self.command_list);

            // 2. Device-owned Vulkan objects
            device.destroy_semaphore(self.fence, None);

            // 3. Drop allocator: free VkDeviceMemory pages BEFORE destroying device.
            //    First drop this Arc, then GpuContext's ManuallyDrop Arc.
            ManuallyDrop::drop(&mut self.allocator);
            match Arc::get_mut(&mut self.gpu_context) {
                Some(ctx) => ManuallyDrop::drop(&mut ctx.allocator),
                None => engine_warn!(
                    "clearframe::vulkan",
                    "GPU resources still alive at device destruction"
                ),
            }

            // 4. Cleanup debug config to prevent callbacks during destruction
            crate::debug::cleanup_debug_config();

            // 5. Destroy debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) = (
                &self.gpu_context.debug_utils_loader,
                &self.gpu_context.debug_messenger,
            ) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 6. Destroy device, surface and instance
            device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}

/// Objects created during `VulkanGraphicsDevice::new` before the device
/// takes ownership of them, destroyed in reverse order if a step fails
struct PartialInit<'a> {
    instance: &'a ash::Instance,
    debug_utils_loader: Option<&'a ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    device: Option<ash::Device>,
}

impl Drop for PartialInit<'_> {
    fn drop(&mut self) {
        unsafe {
            if let Some(device) = self.device.take() {
                device.destroy_device(None);
            }
            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
            }
            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) = (self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
