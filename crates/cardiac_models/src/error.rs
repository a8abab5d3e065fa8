//! Error types for the classifier network.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while loading or running the classifier.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The parameter artifact is missing or corrupt.
    #[error("Failed to load model from {path}: {reason}")]
    Load {
        /// Checkpoint location.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A prediction was requested before parameters were loaded.
    #[error("Model parameters are not loaded")]
    NotLoaded,

    /// Writing a checkpoint failed.
    #[error("Failed to save model to {path}: {reason}")]
    Save {
        /// Checkpoint location.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Numeric failure during the forward or backward pass.
    #[error("Inference error: {0}")]
    Inference(String),

    /// A target class index outside the network's output range.
    #[error("Invalid target class {index}: the model has {n_classes} classes")]
    InvalidTargetClass {
        /// Requested index.
        index: usize,
        /// Number of output classes.
        n_classes: usize,
    },

    /// Architecture parameters that cannot build a network.
    #[error("Invalid model config: {0}")]
    InvalidConfig(String),

    /// Core type error.
    #[error("Core error: {0}")]
    Core(#[from] cardiac_core::CoreError),
}
