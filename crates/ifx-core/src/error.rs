//! Error types for ifx-core operations.
//!
//! Only image construction can fail in this crate; everything else is
//! infallible value plumbing.

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building host-side image values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Width or height is zero.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Pixel count does not match `width * height`.
    #[error("pixel count mismatch: {width}x{height} needs {expected} pixels, got {actual}")]
    DimensionMismatch {
        /// Image width
        width: u32,
        /// Image height
        height: u32,
        /// `width * height`
        expected: usize,
        /// Length of the supplied pixel buffer
        actual: usize,
    },
}
