//! Error types for the pep codec.

use thiserror::Error;

/// Error variants for pep operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The image has no pixels, or the descriptor carries no payload.
    #[error("empty image")]
    EmptyImage,

    /// A dimension is outside the representable 1..=4096 range.
    #[error("dimensions {width}x{height} outside 1..=4096")]
    DimensionsOutOfRange {
        /// Offending width.
        width: u16,
        /// Offending height.
        height: u16,
    },

    /// The pixel buffer does not hold `width * height` entries.
    #[error("pixel buffer holds {got} pixels, expected {expected}")]
    PixelCountMismatch {
        /// `width * height`.
        expected: usize,
        /// Actual slice length.
        got: usize,
    },

    /// The serialized stream ended early or is malformed.
    #[error("truncated or malformed stream")]
    TruncatedStream,

    /// An I/O error occurred while saving or loading.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for pep operations.
pub type Result<T> = std::result::Result<T, Error>;
