/// Scene lifecycle hooks.
///
/// The application calls `on_init` once after the renderer is up,
/// `on_update` then (inside the frame) `on_render` every loop iteration,
/// and `on_close` once after the renderer has been shut down.

/// Per-application behavior plugged into the frame loop.
pub trait Scene {
    /// Called once before the first frame. `false` aborts startup.
    fn on_init(&mut self) -> bool;

    /// Advance simulation by `dt` seconds.
    fn on_update(&mut self, dt: f32);

    /// Called while the frame's command list is recording, with the back
    /// buffer bound as render target.
    fn on_render(&mut self);

    /// Called once at shutdown. Non-zero is reported as a failure.
    fn on_close(&mut self) -> i32;
}

/// Scene that does nothing; the frame is just the clear.
#[derive(Debug, Default)]
pub struct EmptyScene;

impl Scene for EmptyScene {
    fn on_init(&mut self) -> bool {
        true
    }

    fn on_update(&mut self, _dt: f32) {}

    fn on_render(&mut self) {}

    fn on_close(&mut self) -> i32 {
        0
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
