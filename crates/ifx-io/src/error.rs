//! Error types for image load/save.

use std::io;
use thiserror::Error;

/// Image I/O error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Extension or content not recognised.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Decoded data does not form a valid image.
    #[error(transparent)]
    Image(#[from] ifx_core::CoreError),
}

impl IoError {
    /// Short stable identifier for one-line diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::DecodeError(_) => "decode",
            Self::EncodeError(_) => "encode",
            Self::Image(_) => "image",
        }
    }
}

/// Result type for image I/O.
pub type IoResult<T> = Result<T, IoError>;
