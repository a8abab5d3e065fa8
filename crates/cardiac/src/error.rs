//! Error type for the prediction pipeline.

use thiserror::Error;

/// Result type alias for prediction operations.
pub type Result<T> = std::result::Result<T, PredictionError>;

/// A failed prediction, carrying the stage that caused it.
#[derive(Error, Debug)]
pub enum PredictionError {
    /// The input could not be read, decoded or preprocessed.
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] cardiac_transforms::TransformError),

    /// Loading or running the classifier failed.
    #[error("Model error: {0}")]
    Model(#[from] cardiac_models::ModelError),

    /// Saliency or explanation setup failed.
    #[error("Explanation error: {0}")]
    Explain(#[from] cardiac_explain::ExplainError),

    /// Invalid predictor configuration.
    #[error("Invalid config: {0}")]
    Config(String),
}

impl PredictionError {
    /// Whether the failure is caused by the caller's input rather than the
    /// pipeline.
    pub fn is_input_error(&self) -> bool {
        use cardiac_models::ModelError;
        use cardiac_transforms::TransformError;

        matches!(
            self,
            PredictionError::Preprocess(
                TransformError::UnsupportedInputType(_) | TransformError::ImageDecode(_)
            ) | PredictionError::Model(ModelError::InvalidTargetClass { .. })
        )
    }
}
