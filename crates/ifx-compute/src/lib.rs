//! Filter kernel dispatch for ifx.
//!
//! Initializes a compute device, keeps two device-side pixel buffers in a
//! ping-pong arrangement, and runs named filter kernels over them so that
//! successive filters chain without extra copies.
//!
//! # Architecture
//!
//! ```text
//! FilterProcessor (backend-erased facade)
//!     └── FilterSession<D: ComputeDevice>
//!             ├── DeviceContext   (device + compiled program)
//!             ├── KernelNameTable (FilterId -> entry point)
//!             ├── PingPong        (input/output device buffers)
//!             └── GaussianMask    (read-only 7x7 weights)
//!
//! ComputeDevice
//!     ├── CpuDevice  (rayon)
//!     └── WgpuDevice (WGSL compute shaders, feature `wgpu`)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ifx_compute::{Backend, FilterProcessor, KernelSource};
//! use ifx_core::FilterId;
//!
//! let source = KernelSource::load_default()?;
//! let mut proc = FilterProcessor::new(Backend::Auto, &source, &image)?;
//! proc.apply(FilterId::Sepia, &mut image)?;
//! proc.apply(FilterId::GaussianBlur, &mut image)?;
//! ```

pub mod backend;
pub mod buffers;
pub mod context;
pub mod mask;
pub mod processor;
pub mod registry;
pub mod session;

pub use backend::{
    BACKEND_ENV, Backend, BufferAccess, ComputeDevice, CpuDevice, DeviceKind, KernelArg, PlatformInfo,
    describe_backends, detect_backends, select_best_backend,
};
#[cfg(feature = "wgpu")]
pub use backend::WgpuDevice;
pub use buffers::PingPong;
pub use context::{DEFAULT_KERNEL_PATH, DeviceContext, KERNEL_PATH_ENV, KernelSource, select_device};
pub use mask::{GaussianMask, MASK_DIVISOR, MASK_RADIUS, MASK_SIZE};
pub use processor::{FilterPipeline, FilterProcessor};
pub use registry::KernelNameTable;
pub use session::{DispatchStats, FilterSession, bind_arguments};

use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of bytes of compiler output kept in [`ComputeError::BuildFailed`].
pub const BUILD_LOG_LIMIT: usize = 2048;

/// Device call errors.
///
/// Every wrapper around a device call returns one of these; the dispatch
/// core never exits the process. The caller decides whether to abort.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("No compute platform found")]
    NoPlatform,

    #[error("No GPU or CPU compute device found")]
    NoDevice,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    #[error("Kernel source not found at {}: {source}", path.display())]
    SourceMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build program executable:\n{log}")]
    BuildFailed { log: String },

    #[error("Kernel entry point not found: {0}")]
    KernelNotFound(String),

    #[error("Failed to bind argument {index} of {kernel}: {reason}")]
    ArgumentBind {
        kernel: String,
        index: usize,
        reason: String,
    },

    #[error("Failed to create buffer: {0}")]
    BufferCreation(String),

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error("Buffer transfer failed: {0}")]
    Transfer(String),

    #[error("Kernel enqueue failed: {0}")]
    Enqueue(String),
}

impl ComputeError {
    /// Short stable identifier for one-line diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoPlatform => "no_platform",
            Self::NoDevice => "no_device",
            Self::BackendNotAvailable(_) => "backend_unavailable",
            Self::DeviceCreation(_) => "device_creation",
            Self::SourceMissing { .. } => "source_missing",
            Self::BuildFailed { .. } => "build_failed",
            Self::KernelNotFound(_) => "kernel_not_found",
            Self::ArgumentBind { .. } => "argument_bind",
            Self::BufferCreation(_) => "buffer_creation",
            Self::BufferSizeMismatch { .. } => "buffer_size_mismatch",
            Self::InvalidDimensions(..) => "invalid_dimensions",
            Self::Transfer(_) => "transfer",
            Self::Enqueue(_) => "enqueue",
        }
    }

    /// Build failure with the compiler log clipped to [`BUILD_LOG_LIMIT`] bytes.
    pub fn build_failed(log: impl Into<String>) -> Self {
        let mut log = log.into();
        if log.len() > BUILD_LOG_LIMIT {
            let mut end = BUILD_LOG_LIMIT;
            while !log.is_char_boundary(end) {
                end -= 1;
            }
            log.truncate(end);
        }
        Self::BuildFailed { log }
    }
}

pub type ComputeResult<T> = Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_log_is_bounded() {
        let err = ComputeError::build_failed("x".repeat(BUILD_LOG_LIMIT * 2));
        match err {
            ComputeError::BuildFailed { log } => assert_eq!(log.len(), BUILD_LOG_LIMIT),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn build_log_truncates_on_char_boundary() {
        // 'é' is two bytes, so the limit falls inside a char
        let text = format!("a{}", "é".repeat(BUILD_LOG_LIMIT));
        let ComputeError::BuildFailed { log } = ComputeError::build_failed(text) else {
            panic!("expected BuildFailed");
        };
        assert!(log.len() <= BUILD_LOG_LIMIT);
        assert!(log.len() >= BUILD_LOG_LIMIT - 1);
    }

    #[test]
    fn codes_are_distinct() {
        let errs = [
            ComputeError::NoPlatform,
            ComputeError::NoDevice,
            ComputeError::build_failed("x"),
            ComputeError::KernelNotFound("k".into()),
            ComputeError::Transfer("t".into()),
            ComputeError::Enqueue("e".into()),
        ];
        let mut codes: Vec<_> = errs.iter().map(ComputeError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
    }
}
