//! Error types for saliency and explanation generation.

use thiserror::Error;

/// Result type alias for explainability operations.
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Errors raised while building or rendering explanations.
#[derive(Error, Debug)]
pub enum ExplainError {
    /// The rectified map has no positive maximum, so it cannot be normalised.
    #[error("Degenerate saliency map: maximum is {max}")]
    DegenerateSaliencyMap {
        /// Maximum value found (zero, negative or not finite).
        max: f32,
    },

    /// Activation and gradient tensors that cannot be combined.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// The saliency tensor could not be copied to the host.
    #[error("Failed to read saliency values: {0}")]
    Readback(String),

    /// Rendering or image encoding failed.
    #[error("Heatmap encoding failed: {0}")]
    Encode(String),

    /// Invalid renderer or policy configuration.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
