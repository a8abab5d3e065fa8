//! Error types for cardiac_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur in cardiac_core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid tensor shape provided.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// Scores that cannot form a probability distribution.
    #[error("Invalid class distribution: {0}")]
    InvalidDistribution(String),

    /// Class index or name outside the enumerated class set.
    #[error("Unknown class: {0}")]
    UnknownClass(String),
}
