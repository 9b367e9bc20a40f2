//! Renderer configuration and fixed presentation constants

use glam::Vec4;
use crate::graphics_device::{SwapchainDesc, TextureFormat};

/// Number of color buffers requested from the swapchain
pub const SWAPCHAIN_BUFFER_COUNT: u32 = 2;

/// Back-buffer format requested from the swapchain
pub const SWAPCHAIN_FORMAT: TextureFormat = TextureFormat::B8G8R8A8_UNORM;

/// Depth/stencil format (backends may fall back to D32_FLOAT_S8_UINT)
pub const DEPTH_STENCIL_FORMAT: TextureFormat = TextureFormat::D24_UNORM_S8_UINT;

/// Constant clear color (cornflower-ish blue)
pub const DEFAULT_CLEAR_COLOR: Vec4 = Vec4::new(0.4, 0.6, 0.9, 1.0);

/// Which validation messages reach the debug callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    Console,
    /// Append to the given file
    File(String),
    Both(String),
}

/// Per-category switches for validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Validation message counters, reported at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Renderer configuration
///
/// Everything has a default; there are no config files, environment
/// variables or command-line flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable the validation layer and debug messenger
    pub enable_validation: bool,
    pub debug_severity: DebugSeverity,
    pub debug_output: DebugOutput,
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Also report synchronization hazards (slow, needs validation enabled)
    pub sync_validation: bool,
    pub app_name: String,
    pub window_title: String,
    /// Client area width requested for the window
    pub window_width: u32,
    /// Client area height requested for the window
    pub window_height: u32,
    pub clear_color: Vec4,
    /// 0 presents immediately, 1 waits for vertical blank
    pub sync_interval: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            sync_validation: false,
            app_name: "Clearframe Application".to_string(),
            window_title: "Clearframe".to_string(),
            window_width: 800,
            window_height: 600,
            clear_color: DEFAULT_CLEAR_COLOR,
            sync_interval: 0,
        }
    }
}

impl Config {
    /// Swapchain description matching the window client area
    pub fn surface_desc(&self) -> SwapchainDesc {
        SwapchainDesc {
            width: 0,
            height: 0,
            buffer_count: SWAPCHAIN_BUFFER_COUNT,
            format: SWAPCHAIN_FORMAT,
            sync_interval: self.sync_interval,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
