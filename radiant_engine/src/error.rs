//! Error types for the Radiant engine
//!
//! One error enum covers the whole core: GPU allocation failures,
//! acceleration-structure build failures, stale bindless references,
//! swapchain loss, and precondition violations. GPU submission errors
//! stay local to the frame and never escape the render loop; build
//! errors propagate to the caller of `register_blas`/`build_tlas`.

use std::fmt;

/// Result type for Radiant engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Radiant engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// GPU memory or bindless-slot exhaustion.
    ///
    /// Fatal to the current frame; recoverable by shrinking cascade
    /// sizes or cascade count at the next config update.
    Allocation(String),

    /// BVH/BLAS/TLAS build failure (empty input, unsupported format,
    /// driver refusal). The affected entity remains unregistered.
    Build(String),

    /// A bindless index was referenced after its resource was freed.
    ///
    /// The ref-counting contract is supposed to prevent this; when
    /// detected the frame is aborted and the index clamped to the
    /// null resource.
    StaleResource(String),

    /// Swapchain acquisition returned out-of-date/suboptimal.
    ///
    /// Triggers a swapchain recreate and skips the current present.
    SwapchainLost,

    /// A contract precondition was violated (query on an unbuilt TLAS,
    /// merge on a malformed cascade ladder, ...). In release builds
    /// the offending operation is skipped.
    Precondition(String),

    /// Backend-specific error (Vulkan driver, OS surface, etc.)
    Backend(String),

    /// Initialization failed (device bring-up, subsystem construction)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Allocation(msg) => write!(f, "Allocation failed: {}", msg),
            Error::Build(msg) => write!(f, "Build failed: {}", msg),
            Error::StaleResource(msg) => write!(f, "Stale resource: {}", msg),
            Error::SwapchainLost => write!(f, "Swapchain lost"),
            Error::Precondition(msg) => write!(f, "Precondition violated: {}", msg),
            Error::Backend(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Construct a backend `Error` and log it with file:line details.
///
/// Used in `ok_or_else`/`map_err` chains:
///
/// ```ignore
/// device.create_texture(desc)
///     .map_err(|e| engine_err!("radiant::Tracer", "texture creation failed: {}", e))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        $crate::engine_error!($source, $($arg)*);
        $crate::error::Error::Backend(format!($($arg)*))
    }};
}

/// Log an error and return early with a backend `Error`.
///
/// ```ignore
/// if !self.is_recording {
///     engine_bail!("radiant::CommandList", "dispatch: command list not recording");
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
