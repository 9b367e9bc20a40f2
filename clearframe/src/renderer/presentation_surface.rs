/// PresentationSurface - swapchain, color-buffer ring, RTV/DSV views and viewport

use crate::config::DEPTH_STENCIL_FORMAT;
use crate::error::{Error, Result};
use crate::graphics_device::{
    DepthStencilDesc, DescriptorHandle, DescriptorHeap, DescriptorHeapType, Rect2D,
    ResourceBarrier, ResourceState, Swapchain, SwapchainDesc, Texture, Viewport,
};
use crate::renderer::DeviceContext;
use crate::{engine_info, engine_warn};

/// Depth value the depth/stencil buffer is optimized to clear to
pub const DEPTH_CLEAR_VALUE: f32 = 1.0;

/// Stencil value the depth/stencil buffer is optimized to clear to
pub const STENCIL_CLEAR_VALUE: u32 = 0;

/// Everything needed to present: N color buffers in a ring, one depth/stencil
/// buffer and the full-window viewport
///
/// The active back-buffer index starts at 0 and only moves through
/// `advance_back_buffer()` (or a resync in `acquire_back_buffer()`).
pub struct PresentationSurface {
    // Views are released before the textures they point at
    rtv_heap: Box<dyn DescriptorHeap>,
    dsv_heap: Box<dyn DescriptorHeap>,
    rtv_handles: Vec<DescriptorHandle>,
    dsv_handle: DescriptorHandle,
    depth_stencil: Box<dyn Texture>,
    swapchain: Box<dyn Swapchain>,
    buffer_count: u32,
    back_buffer_index: u32,
    viewport: Viewport,
    scissor: Rect2D,
}

impl PresentationSurface {
    /// Create the swapchain and its views, then move the depth buffer to
    /// `DepthWrite` and the color buffers to `Present` with a flushed
    /// one-time submission
    ///
    /// The command list must be closed and the GPU idle on entry.
    pub fn initialize(ctx: &mut DeviceContext, desc: &SwapchainDesc) -> Result<Self> {
        let swapchain = ctx.device().create_swapchain(desc)?;
        let width = swapchain.width();
        let height = swapchain.height();
        let buffer_count = swapchain.buffer_count();

        if buffer_count == 0 {
            return Err(Error::InitializationFailed("swapchain created no buffers".to_string()));
        }
        if buffer_count != desc.buffer_count {
            engine_warn!(
                "clearframe::PresentationSurface",
                "Requested {} swapchain buffers, got {}",
                desc.buffer_count, buffer_count
            );
        }

        let mut rtv_heap = ctx.device().create_descriptor_heap(DescriptorHeapType::Rtv, buffer_count)?;
        let mut rtv_handles = Vec::with_capacity(buffer_count as usize);
        for index in 0..buffer_count {
            rtv_handles.push(rtv_heap.create_view(index, swapchain.buffer(index)?)?);
        }

        let mut dsv_heap = ctx.device().create_descriptor_heap(DescriptorHeapType::Dsv, 1)?;
        let depth_stencil = ctx.device().create_depth_stencil(&DepthStencilDesc {
            width,
            height,
            format: DEPTH_STENCIL_FORMAT,
            clear_depth: DEPTH_CLEAR_VALUE,
            clear_stencil: STENCIL_CLEAR_VALUE,
        })?;
        let dsv_handle = dsv_heap.create_view(0, depth_stencil.as_ref())?;

        let mut barriers = Vec::with_capacity(buffer_count as usize + 1);
        barriers.push(ResourceBarrier::transition(
            depth_stencil.as_ref(),
            ResourceState::Common,
            ResourceState::DepthWrite,
        ));
        for index in 0..buffer_count {
            barriers.push(ResourceBarrier::transition(
                swapchain.buffer(index)?,
                ResourceState::Common,
                ResourceState::Present,
            ));
        }

        ctx.reset_command_list()?;
        ctx.command_list().resource_barrier(&barriers)?;
        ctx.submit_and_flush()?;

        engine_info!(
            "clearframe::PresentationSurface",
            "Presentation surface ready: {}x{}, {} buffers, {:?}",
            width, height, buffer_count, swapchain.format()
        );

        Ok(Self {
            rtv_heap,
            dsv_heap,
            rtv_handles,
            dsv_handle,
            depth_stencil,
            swapchain,
            buffer_count,
            back_buffer_index: 0,
            viewport: Viewport::full(width, height),
            scissor: Rect2D::full(width, height),
        })
    }

    /// Render-target view of color buffer `index`
    pub fn color_buffer_handle(&self, index: u32) -> Result<DescriptorHandle> {
        self.rtv_handles.get(index as usize).copied().ok_or_else(|| {
            Error::InvalidResource(format!(
                "color buffer {} out of range (count: {})",
                index, self.buffer_count
            ))
        })
    }

    pub fn color_buffer(&self, index: u32) -> Result<&dyn Texture> {
        if index >= self.buffer_count {
            return Err(Error::InvalidResource(format!(
                "color buffer {} out of range (count: {})",
                index, self.buffer_count
            )));
        }
        self.swapchain.buffer(index)
    }

    pub fn depth_stencil_handle(&self) -> DescriptorHandle {
        self.dsv_handle
    }

    pub fn depth_stencil(&self) -> &dyn Texture {
        self.depth_stencil.as_ref()
    }

    pub fn back_buffer_index(&self) -> u32 {
        self.back_buffer_index
    }

    /// Move to the next color buffer in the ring
    pub fn advance_back_buffer(&mut self) {
        self.back_buffer_index = (self.back_buffer_index + 1) % self.buffer_count;
    }

    /// Ask the swapchain for the next buffer
    ///
    /// If the presentation engine hands back a different buffer than the ring
    /// expects, the ring follows the swapchain.
    pub fn acquire_back_buffer(&mut self) -> Result<u32> {
        let acquired = self.swapchain.acquire_next_buffer()?;
        if acquired >= self.buffer_count {
            return Err(Error::InvalidResource(format!(
                "swapchain returned buffer {} (count: {})",
                acquired, self.buffer_count
            )));
        }
        if acquired != self.back_buffer_index {
            engine_warn!(
                "clearframe::PresentationSurface",
                "Swapchain acquired buffer {} while ring expected {}",
                acquired, self.back_buffer_index
            );
            self.back_buffer_index = acquired;
        }
        Ok(acquired)
    }

    /// Present the current back buffer
    pub fn present(&mut self) -> Result<()> {
        self.swapchain.present(self.back_buffer_index)
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    pub fn width(&self) -> u32 {
        self.swapchain.width()
    }

    pub fn height(&self) -> u32 {
        self.swapchain.height()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scissor(&self) -> Rect2D {
        self.scissor
    }

    pub fn rtv_heap(&self) -> &dyn DescriptorHeap {
        self.rtv_heap.as_ref()
    }

    pub fn dsv_heap(&self) -> &dyn DescriptorHeap {
        self.dsv_heap.as_ref()
    }
}

#[cfg(test)]
#[path = "presentation_surface_tests.rs"]
mod tests;
