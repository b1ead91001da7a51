//! Error types for handle operations.
//!
//! Failures reported by the foreign library itself are not errors at this
//! level: their status codes are handed back verbatim inside `Ok`.

use thiserror::Error;

/// Result type alias for handle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The handle was destroyed (freed, closed, or torn down with the
    /// library).
    #[error("handle is null or already destroyed")]
    NullHandle,

    /// A caller-supplied pixel buffer has a shape that cannot be retained.
    #[error("unsupported pixel buffer shape: {shape}")]
    UnsupportedBufferShape { shape: String },

    /// A caller-supplied pixel buffer is shorter than `pitch * height`.
    #[error("pixel buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// The surface has no CPU-visible pixels (hardware surface not locked).
    #[error("surface pixels are not accessible; lock the surface first")]
    PixelsUnavailable,

    /// Two handles from different library contexts were combined.
    #[error("handles belong to different contexts")]
    ContextMismatch,

    /// A string argument contained an interior NUL byte.
    #[error("string contains an interior NUL byte: {0:?}")]
    InvalidString(String),
}

impl Error {
    /// Check if this is a destroyed-handle error.
    pub fn is_null_handle(&self) -> bool {
        matches!(self, Error::NullHandle)
    }
}
