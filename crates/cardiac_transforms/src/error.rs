//! Error types for image preprocessing.

use thiserror::Error;

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors that can occur while turning an input into a network tensor.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The input is not an image form the decoder accepts.
    #[error("Unsupported image input type: {0}")]
    UnsupportedInputType(String),

    /// The bytes could not be decoded as an image.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Reading the image from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Preprocessing parameters are inconsistent.
    #[error("Invalid preprocessing config: {0}")]
    InvalidConfig(String),

    /// Building the output tensor failed.
    #[error("Core error: {0}")]
    Core(#[from] cardiac_core::CoreError),
}

// Decoders only see in-memory buffers, so an I/O error raised by a decoder
// means truncated data rather than a filesystem problem.
impl From<image::ImageError> for TransformError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => Self::UnsupportedInputType(e.to_string()),
            other => Self::ImageDecode(other.to_string()),
        }
    }
}
