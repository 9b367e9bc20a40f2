//! Error types for the Clearframe engine
//!
//! This module defines the error type shared by the core crate and the
//! graphics backends, plus the `engine_err!`/`engine_bail!` helpers that log
//! an error at the point of detection before handing it to the caller.

use std::fmt;

/// Result type for Clearframe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Clearframe errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan call, submission, presentation)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (out-of-range buffer index, unknown handle, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, descriptor heaps, ...)
    InitializationFailed(String),

    /// Operation called in the wrong state (frame not idle, barrier mismatch, ...)
    InvalidState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and build an `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use clearframe::engine_err;
/// let err = engine_err!("clearframe::vulkan", "Failed to submit: {}", "VK_ERROR_DEVICE_LOST");
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::cf::Engine::log_detailed(
            $crate::cf::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::cf::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with `Error::BackendError`
///
/// # Example
///
/// ```no_run
/// # use clearframe::engine_bail;
/// fn check(index: u32) -> clearframe::cf::Result<()> {
///     if index > 2 {
///         engine_bail!("clearframe::Renderer", "Index {} out of range", index);
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
