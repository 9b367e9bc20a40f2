/// FrameRenderer - records, submits and presents one frame

use glam::Vec4;

use crate::error::{Error, Result};
use crate::graphics_device::ResourceState;
use crate::renderer::{DeviceContext, FrameState, PresentationSurface};
use crate::scene::Scene;
use crate::{engine_error, engine_trace};

/// Where the frame renderer is in its cycle
///
/// `Idle -> Recording -> Submitted -> Presented -> Idle`. A failure leaves
/// the phase where it happened, and no further frame is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Recording,
    Submitted,
    Presented,
}

pub struct FrameRenderer {
    phase: FramePhase,
    clear_color: [f32; 4],
    frames_rendered: u64,
}

impl FrameRenderer {
    pub fn new(clear_color: Vec4) -> Self {
        Self {
            phase: FramePhase::Idle,
            clear_color: clear_color.to_array(),
            frames_rendered: 0,
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Frames that completed the whole cycle
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Render one frame: clear the current back buffer, let the scene record,
    /// present, advance the ring and wait for the GPU
    pub fn render_frame(
        &mut self,
        ctx: &mut DeviceContext,
        surface: &mut PresentationSurface,
        scene: &mut dyn Scene,
    ) -> Result<()> {
        if self.phase != FramePhase::Idle {
            engine_error!(
                "clearframe::FrameRenderer",
                "Frame requested while renderer is {:?}",
                self.phase
            );
            return Err(Error::InvalidState(format!(
                "frame renderer is {:?}, expected Idle",
                self.phase
            )));
        }

        // Idle -> Recording
        self.phase = FramePhase::Recording;
        let index = surface.acquire_back_buffer()?;
        ctx.reset_command_list()?;

        let mut frame = FrameState::begin(index, surface)?;
        let back_buffer = surface.color_buffer(index)?;
        let rtv = surface.color_buffer_handle(index)?;
        let dsv = surface.depth_stencil_handle();

        let to_render_target = frame.transition(back_buffer, ResourceState::RenderTarget)?;
        {
            let cmd = ctx.command_list();
            cmd.resource_barrier(&[to_render_target])?;
            cmd.set_viewport(surface.viewport())?;
            cmd.set_scissor(surface.scissor())?;
            cmd.clear_render_target_view(rtv, self.clear_color)?;
            cmd.set_render_targets(&[rtv], Some(dsv))?;
        }

        scene.on_render();

        let to_present = frame.transition(back_buffer, ResourceState::Present)?;
        ctx.command_list().resource_barrier(&[to_present])?;
        frame.verify_presentable()?;

        // Recording -> Submitted
        ctx.submit()?;
        self.phase = FramePhase::Submitted;

        surface.present()?;
        surface.advance_back_buffer();
        self.phase = FramePhase::Presented;

        // Presented -> Idle
        ctx.flush()?;
        self.phase = FramePhase::Idle;
        self.frames_rendered += 1;

        engine_trace!(
            "clearframe::FrameRenderer",
            "Frame {} presented buffer {} (fence {})",
            self.frames_rendered, index, ctx.fence_value()
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
