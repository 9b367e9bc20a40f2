/// Renderer module - device context, presentation surface and frame loop

pub mod device_context;
pub mod presentation_surface;
pub mod frame_state;
pub mod frame_renderer;
pub mod renderer;

pub use device_context::DeviceContext;
pub use presentation_surface::PresentationSurface;
pub use frame_state::FrameState;
pub use frame_renderer::{FramePhase, FrameRenderer};
pub use renderer::Renderer;
