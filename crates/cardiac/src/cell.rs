//! One-time predictor initialisation.

use burn::tensor::backend::AutodiffBackend;
use cardiac_models::{checkpoint, ModelError};
use cardiac_transforms::ImageInput;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::PredictorConfig;
use crate::error::Result;
use crate::predictor::{PredictOptions, PredictionResult, Predictor};

/// Readiness report for the serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Architecture served.
    pub model: String,
    /// Whether parameters are loaded.
    pub ready: bool,
}

/// Holds a [`Predictor`] that is loaded at most once.
///
/// Concurrent first callers of [`PredictorCell::get_or_load`] block on a
/// single load and then share its result. A failed load is not cached, so a
/// later call retries. Nothing is observable until loading has completed.
pub struct PredictorCell<B: AutodiffBackend> {
    config: PredictorConfig,
    device: B::Device,
    predictor: OnceCell<Predictor<B>>,
}

impl<B: AutodiffBackend> PredictorCell<B> {
    /// Create an empty cell. No I/O happens until the first load.
    pub fn new(config: PredictorConfig, device: B::Device) -> Self {
        Self {
            config,
            device,
            predictor: OnceCell::new(),
        }
    }

    /// The configuration the predictor is (or will be) built from.
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Return the predictor, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Load`] if the checkpoint is missing or corrupt.
    pub fn get_or_load(&self) -> Result<&Predictor<B>> {
        self.predictor.get_or_try_init(|| {
            tracing::info!(checkpoint = %self.config.checkpoint.display(), "loading predictor");
            Predictor::load(&self.config, self.device.clone())
        })
    }

    /// Return the predictor if it has been loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotLoaded`] before a successful load.
    pub fn get(&self) -> Result<&Predictor<B>> {
        Ok(self.predictor.get().ok_or(ModelError::NotLoaded)?)
    }

    /// Whether a predictor is loaded.
    pub fn is_loaded(&self) -> bool {
        self.predictor.get().is_some()
    }

    /// Predict with the loaded predictor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotLoaded`] before a successful load, otherwise
    /// the errors of [`Predictor::predict_with`].
    pub fn predict(
        &self,
        input: impl Into<ImageInput>,
        options: &PredictOptions,
    ) -> Result<PredictionResult> {
        self.get()?.predict_with(input, options)
    }

    /// Readiness report.
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            model: checkpoint::ARCH.to_string(),
            ready: self.is_loaded(),
        }
    }
}

impl<B: AutodiffBackend> std::fmt::Debug for PredictorCell<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictorCell")
            .field("config", &self.config)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}
