/// CommandList trait - records barriers, clears and render-target bindings

use crate::error::Result;
use crate::graphics_device::{DescriptorHandle, ResourceHandle, Texture, TextureFormat};

/// Resource usage state, as seen by explicit barriers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Initial state of a freshly created resource
    Common,
    /// Owned by the presentation engine
    Present,
    /// Bound as a color attachment
    RenderTarget,
    /// Bound as a writable depth/stencil attachment
    DepthWrite,
}

/// A resource state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBarrier {
    pub resource: ResourceHandle,
    /// Format of the resource (backends derive the image aspect from it)
    pub format: TextureFormat,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl ResourceBarrier {
    /// Build a transition barrier for `texture`
    pub fn transition(texture: &dyn Texture, before: ResourceState, after: ResourceState) -> Self {
        Self {
            resource: texture.handle(),
            format: texture.info().format,
            before,
            after,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-surface viewport with depth range [0, 1]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Command list for recording GPU work
///
/// Created closed. `reset()` resets the owning allocator and opens the list
/// for recording; `close()` ends recording so the device can execute it.
/// Every recording method fails if the list is not recording.
pub trait CommandList: Send {
    /// Reset the command allocator and the list, and begin recording
    fn reset(&mut self) -> Result<()>;

    /// End recording
    fn close(&mut self) -> Result<()>;

    fn is_recording(&self) -> bool;

    /// Record explicit state transitions
    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Clear a render-target view; its resource must be in `RenderTarget`
    fn clear_render_target_view(&mut self, rtv: DescriptorHandle, color: [f32; 4]) -> Result<()>;

    /// Bind color and (optional) depth/stencil views for subsequent draws
    fn set_render_targets(
        &mut self,
        rtvs: &[DescriptorHandle],
        dsv: Option<DescriptorHandle>,
    ) -> Result<()>;
}

#[cfg(test)]
#[path = "command_list_tests.rs"]
mod tests;
