/// CommandList - Vulkan implementation of the engine CommandList trait
///
/// Render-target binding uses dynamic rendering (Vulkan 1.3): `set_render_targets`
/// opens a rendering scope that stays open until the next barrier, clear or
/// `close()`, since layout transitions are not allowed inside one.

use ash::vk;
use ash::vk::Handle;
use clearframe::cf::render::{
    CommandList as RendererCommandList, DescriptorHandle, DescriptorHeapType, Rect2D,
    ResourceBarrier, Viewport,
};
use clearframe::cf::{Error, Result};
use clearframe::{engine_err, engine_error};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_heap::{ViewInfo, ViewRegistry};
use crate::vulkan_format::{
    aspect_mask, color_attachment_barrier, needs_image_barrier, state_to_access, state_to_layout,
    state_to_stage,
};

/// Vulkan command list implementation
///
/// One command pool with one primary command buffer, reset and re-recorded
/// every frame.
pub struct CommandList {
    gpu_context: Arc<GpuContext>,
    /// Command pool for allocating the command buffer
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether a dynamic rendering scope is open
    in_rendering: bool,
    /// Views created by the descriptor heaps
    views: ViewRegistry,
}

impl CommandList {
    /// Create a new command list
    ///
    /// # Arguments
    ///
    /// * `gpu_context` - Shared GPU context (device and graphics queue family)
    /// * `views` - View registry shared with the descriptor heaps
    pub(crate) fn new(gpu_context: Arc<GpuContext>, views: ViewRegistry) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(gpu_context.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = gpu_context
                .device
                .create_command_pool(&command_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("clearframe::vulkan", "Failed to create command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match gpu_context.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) if !buffers.is_empty() => buffers[0],
                Ok(_) | Err(_) => {
                    gpu_context.device.destroy_command_pool(command_pool, None);
                    engine_error!("clearframe::vulkan", "Failed to allocate command buffer");
                    return Err(Error::InitializationFailed("Failed to allocate command buffer".to_string()));
                }
            };

            Ok(Self {
                gpu_context,
                command_pool,
                command_buffer,
                is_recording: false,
                in_rendering: false,
                views,
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn ensure_recording(&self, operation: &str) -> Result<()> {
        if !self.is_recording {
            return Err(Error::InvalidState(format!("{}: command list is closed", operation)));
        }
        Ok(())
    }

    fn end_rendering(&mut self) {
        if self.in_rendering {
            unsafe {
                self.gpu_context.device.cmd_end_rendering(self.command_buffer);
            }
            self.in_rendering = false;
        }
    }

    fn lookup_view(&self, handle: DescriptorHandle, expected: DescriptorHeapType) -> Result<ViewInfo> {
        if handle.heap_type != expected {
            return Err(Error::InvalidResource(format!(
                "expected a {:?} descriptor, got {:?}",
                expected, handle.heap_type
            )));
        }
        let views = self
            .views
            .lock()
            .map_err(|_| engine_err!("clearframe::vulkan", "View registry lock poisoned"))?;
        views.get(&handle.raw).copied().ok_or_else(|| {
            Error::InvalidResource(format!("descriptor {:#x} has no live view", handle.raw))
        })
    }

    fn color_attachment(view: vk::ImageView, load_op: vk::AttachmentLoadOp, color: [f32; 4]) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(load_op)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue { float32: color },
            })
    }
}

impl RendererCommandList for CommandList {
    fn reset(&mut self) -> Result<()> {
        unsafe {
            self.gpu_context
                .device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.gpu_context
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        self.in_rendering = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_recording("close")?;
        self.end_rendering();

        unsafe {
            self.gpu_context
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("clearframe::vulkan", "Failed to end command buffer: {:?}", e))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_recording
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) -> Result<()> {
        self.ensure_recording("resource_barrier")?;
        self.end_rendering();

        let mut src_stage = vk::PipelineStageFlags::empty();
        let mut dst_stage = vk::PipelineStageFlags::empty();
        let image_barriers: Vec<vk::ImageMemoryBarrier> = barriers
            .iter()
            .filter(|b| needs_image_barrier(b.before, b.after))
            .map(|b| {
                src_stage |= state_to_stage(b.before, true);
                dst_stage |= state_to_stage(b.after, false);
                vk::ImageMemoryBarrier::default()
                    .old_layout(state_to_layout(b.before, true))
                    .new_layout(state_to_layout(b.after, false))
                    .src_access_mask(state_to_access(b.before))
                    .dst_access_mask(state_to_access(b.after))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(vk::Image::from_raw(b.resource.0))
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: aspect_mask(b.format),
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
            })
            .collect();

        if image_barriers.is_empty() {
            return Ok(());
        }

        unsafe {
            self.gpu_context.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &image_barriers,
            );
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording("set_viewport")?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.gpu_context.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording("set_scissor")?;

        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };

        unsafe {
            self.gpu_context.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn clear_render_target_view(&mut self, rtv: DescriptorHandle, color: [f32; 4]) -> Result<()> {
        self.ensure_recording("clear_render_target_view")?;
        let view = self.lookup_view(rtv, DescriptorHeapType::Rtv)?;
        self.end_rendering();

        // A rendering scope with a CLEAR load op over the whole image
        let attachments = [Self::color_attachment(
            vk::ImageView::from_raw(rtv.raw),
            vk::AttachmentLoadOp::CLEAR,
            color,
        )];
        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: view.extent,
            })
            .layer_count(1)
            .color_attachments(&attachments);

        unsafe {
            let device = &self.gpu_context.device;
            device.cmd_begin_rendering(self.command_buffer, &rendering_info);
            device.cmd_end_rendering(self.command_buffer);

            // The cleared contents are read back by the next LOAD scope
            device.cmd_pipeline_barrier(
                self.command_buffer,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::DependencyFlags::empty(),
                &[color_attachment_barrier()],
                &[],
                &[],
            );
        }
        Ok(())
    }

    fn set_render_targets(
        &mut self,
        rtvs: &[DescriptorHandle],
        dsv: Option<DescriptorHandle>,
    ) -> Result<()> {
        self.ensure_recording("set_render_targets")?;

        let color_views = rtvs
            .iter()
            .map(|&rtv| self.lookup_view(rtv, DescriptorHeapType::Rtv))
            .collect::<Result<Vec<_>>>()?;
        let depth_view = dsv
            .map(|handle| self.lookup_view(handle, DescriptorHeapType::Dsv))
            .transpose()?;

        let extent = match color_views.first().or(depth_view.as_ref()) {
            Some(view) => view.extent,
            None => {
                return Err(Error::InvalidResource("set_render_targets: no targets".to_string()));
            }
        };

        self.end_rendering();

        let color_attachments: Vec<vk::RenderingAttachmentInfo> = rtvs
            .iter()
            .map(|rtv| Self::color_attachment(vk::ImageView::from_raw(rtv.raw), vk::AttachmentLoadOp::LOAD, [0.0; 4]))
            .collect();

        let depth_attachment = dsv.map(|handle| {
            vk::RenderingAttachmentInfo::default()
                .image_view(vk::ImageView::from_raw(handle.raw))
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
        });

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .layer_count(1)
            .color_attachments(&color_attachments);

        if let (Some(attachment), Some(view)) = (depth_attachment.as_ref(), depth_view) {
            rendering_info = rendering_info.depth_attachment(attachment);
            if view.format.has_stencil() {
                rendering_info = rendering_info.stencil_attachment(attachment);
            }
        }

        unsafe {
            self.gpu_context.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        self.in_rendering = true;
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Command buffer is freed with its pool
            self.gpu_context.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
