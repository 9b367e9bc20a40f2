/// FrameState - per-frame record of assumed resource states

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{ResourceBarrier, ResourceHandle, ResourceState, Texture};
use crate::renderer::PresentationSurface;
use crate::engine_trace;

/// Resource states as implied by the barriers recorded so far this frame
///
/// Built at the start of a frame from the surface's steady state (every color
/// buffer in `Present`, the depth buffer in `DepthWrite`) and discarded when
/// the frame ends.
#[derive(Debug)]
pub struct FrameState {
    buffer_index: u32,
    states: FxHashMap<ResourceHandle, ResourceState>,
    color_buffers: Vec<ResourceHandle>,
}

impl FrameState {
    pub fn begin(buffer_index: u32, surface: &PresentationSurface) -> Result<Self> {
        let mut states = FxHashMap::default();
        let mut color_buffers = Vec::with_capacity(surface.buffer_count() as usize);
        for index in 0..surface.buffer_count() {
            let handle = surface.color_buffer(index)?.handle();
            states.insert(handle, ResourceState::Present);
            color_buffers.push(handle);
        }
        states.insert(surface.depth_stencil().handle(), ResourceState::DepthWrite);

        Ok(Self {
            buffer_index,
            states,
            color_buffers,
        })
    }

    /// Index of the color buffer this frame renders to
    pub fn buffer_index(&self) -> u32 {
        self.buffer_index
    }

    pub fn state_of(&self, resource: ResourceHandle) -> Option<ResourceState> {
        self.states.get(&resource).copied()
    }

    /// Build the barrier moving `texture` from its tracked state to `after`
    /// and record the new state
    pub fn transition(&mut self, texture: &dyn Texture, after: ResourceState) -> Result<ResourceBarrier> {
        let handle = texture.handle();
        let before = self.state_of(handle).ok_or_else(|| {
            Error::InvalidResource(format!("{:?} is not tracked by this frame", handle))
        })?;
        self.states.insert(handle, after);
        engine_trace!("clearframe::FrameState", "{:?}: {:?} -> {:?}", handle, before, after);
        Ok(ResourceBarrier::transition(texture, before, after))
    }

    /// Every color buffer must be back in `Present` before the list is closed
    pub fn verify_presentable(&self) -> Result<()> {
        for handle in &self.color_buffers {
            let state = self.state_of(*handle);
            if state != Some(ResourceState::Present) {
                return Err(Error::InvalidState(format!(
                    "color buffer {:?} is in {:?} at end of frame {}",
                    handle, state, self.buffer_index
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_state_tests.rs"]
mod tests;
