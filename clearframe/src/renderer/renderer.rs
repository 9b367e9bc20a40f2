/// Renderer - single owner of the device context, surface and frame renderer

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graphics_device::GraphicsDevice;
use crate::renderer::{DeviceContext, FramePhase, FrameRenderer, PresentationSurface};
use crate::scene::Scene;
use crate::{engine_info, engine_warn};

/// Owns every GPU object of the application
///
/// # Example
///
/// ```no_run
/// use clearframe::cf::{Config, Renderer, scene::EmptyScene};
/// # fn device() -> Box<dyn clearframe::cf::render::GraphicsDevice> { unimplemented!() }
///
/// let config = Config::default();
/// let mut renderer = Renderer::new(&config);
/// renderer.initialize(device(), &config)?;
/// renderer.render_frame(&mut EmptyScene)?;
/// renderer.shutdown()?;
/// # Ok::<(), clearframe::cf::Error>(())
/// ```
pub struct Renderer {
    // Surface is released before the context that created it
    surface: Option<PresentationSurface>,
    context: Option<DeviceContext>,
    frame_renderer: FrameRenderer,
}

impl Renderer {
    pub fn new(config: &Config) -> Self {
        Self {
            surface: None,
            context: None,
            frame_renderer: FrameRenderer::new(config.clear_color),
        }
    }

    /// Take ownership of `device` and build the presentation surface on it
    ///
    /// On failure the device is kept so `shutdown()` can still drain it.
    pub fn initialize(&mut self, device: Box<dyn GraphicsDevice>, config: &Config) -> Result<()> {
        if self.context.is_some() {
            return Err(Error::InvalidState("renderer already initialized".to_string()));
        }

        let context = self.context.insert(DeviceContext::new(device));
        let surface = PresentationSurface::initialize(context, &config.surface_desc())?;
        self.surface = Some(surface);

        engine_info!("clearframe::Renderer", "Renderer initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some() && self.surface.is_some()
    }

    /// Render and present one frame
    pub fn render_frame(&mut self, scene: &mut dyn Scene) -> Result<()> {
        match (self.context.as_mut(), self.surface.as_mut()) {
            (Some(context), Some(surface)) => self.frame_renderer.render_frame(context, surface, scene),
            _ => Err(Error::InvalidState("renderer not initialized".to_string())),
        }
    }

    /// Drain the GPU and release the surface, then the device
    ///
    /// Without a device this is a no-op, so calling it twice is fine.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };

        let flushed = context.flush();
        self.surface = None;
        self.context = None;

        match &flushed {
            Ok(()) => engine_info!("clearframe::Renderer", "Renderer shut down"),
            Err(e) => engine_warn!("clearframe::Renderer", "Shutdown flush failed: {}", e),
        }
        flushed
    }

    pub fn surface(&self) -> Option<&PresentationSurface> {
        self.surface.as_ref()
    }

    pub fn device_context(&self) -> Option<&DeviceContext> {
        self.context.as_ref()
    }

    pub fn frame_phase(&self) -> FramePhase {
        self.frame_renderer.phase()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_renderer.frames_rendered()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if self.context.is_some() {
            let _ = self.shutdown();
        }
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
