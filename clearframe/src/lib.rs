/*!
# Clearframe

Core types for a minimal clear-and-present renderer.

This crate holds the platform-agnostic side: the graphics-device traits a GPU
backend implements, and the presentation logic built on top of them. The
Vulkan backend lives in `clearframe_renderer_vulkan`.

## Architecture

- **GraphicsDevice**: device, direct queue, command list and fence (trait)
- **DeviceContext**: owns the device and the monotonic fence counter
- **PresentationSurface**: swapchain, color-buffer ring, RTV/DSV views, viewport
- **FrameRenderer**: one frame of transition, clear, present and flush
- **Renderer**: single owner of all of the above
- **Scene**: application hooks driven by the frame loop
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod renderer;
pub mod scene;
pub mod timer;

// Main namespace module
pub mod cf {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{
        Config, DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats,
        DEFAULT_CLEAR_COLOR, DEPTH_STENCIL_FORMAT, SWAPCHAIN_BUFFER_COUNT, SWAPCHAIN_FORMAT,
    };

    // Owning renderer and timer
    pub use crate::renderer::Renderer;
    pub use crate::timer::GameTimer;

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Graphics-device traits and types, for backends
    pub mod render {
        pub use crate::graphics_device::*;
        pub use crate::renderer::{
            DeviceContext, FramePhase, FrameRenderer, FrameState, PresentationSurface,
        };
    }

    // Scene hooks
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;

