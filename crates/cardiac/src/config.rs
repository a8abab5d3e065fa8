//! Predictor configuration.

use std::path::{Path, PathBuf};

use cardiac_explain::{ExplanationConfig, HeatmapConfig};
use cardiac_transforms::PreprocessConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PredictionError, Result};

/// Default checkpoint stem, relative to the working directory.
pub const DEFAULT_CHECKPOINT: &str = "best_model";

/// Everything needed to build a [`Predictor`](crate::Predictor).
///
/// # Example
///
/// ```rust
/// use cardiac::PredictorConfig;
///
/// let config: PredictorConfig =
///     serde_json::from_str(r#"{ "checkpoint": "weights/cardiac", "seed": 42 }"#).unwrap();
/// assert_eq!(config.preprocess.crop, 224);
/// assert_eq!(config.seed, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Checkpoint stem: weights in `<stem>.mpk`, metadata in `<stem>.json`.
    pub checkpoint: PathBuf,
    /// Image preprocessing.
    pub preprocess: PreprocessConfig,
    /// Heatmap rendering.
    pub heatmap: HeatmapConfig,
    /// Explanation text policy.
    pub explanation: ExplanationConfig,
    /// Seed for explanation selection; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            checkpoint: PathBuf::from(DEFAULT_CHECKPOINT),
            preprocess: PreprocessConfig::default(),
            heatmap: HeatmapConfig::default(),
            explanation: ExplanationConfig::default(),
            seed: None,
        }
    }
}

impl PredictorConfig {
    /// Configuration with defaults and the given checkpoint.
    pub fn new(checkpoint: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint: checkpoint.into(),
            ..Self::default()
        }
    }

    /// Fix the explanation seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::Config`] if the file is missing or malformed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PredictionError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| PredictionError::Config(format!("{}: {e}", path.display())))
    }

    /// Save to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::Config`] if serialization or the write fails.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PredictionError::Config(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| PredictionError::Config(format!("{}: {e}", path.display())))
    }
}
