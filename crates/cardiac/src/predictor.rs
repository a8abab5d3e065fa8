//! The prediction orchestrator.

use std::sync::Arc;

use burn::tensor::backend::AutodiffBackend;
use cardiac_core::{CardiacClass, ClassDistribution, Seed};
use cardiac_explain::{grad_cam, ExplainError, ExplanationPolicy, Finding, HeatmapRenderer};
use cardiac_models::{Classifier, Evaluation, ModelError};
use cardiac_transforms::{ImageInput, Preprocessor};
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::PredictorConfig;
use crate::error::{PredictionError, Result};

/// Per-call options for [`Predictor::predict_with`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictOptions {
    /// Class the heatmap explains; the predicted class when `None`.
    pub target_class: Option<usize>,
    /// Whether to compute and encode the heatmap at all.
    pub include_gradcam: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            target_class: None,
            include_gradcam: true,
        }
    }
}

impl PredictOptions {
    /// Explain a specific class instead of the predicted one.
    #[must_use]
    pub fn with_target_class(mut self, class: usize) -> Self {
        self.target_class = Some(class);
        self
    }

    /// Skip the heatmap.
    #[must_use]
    pub fn without_gradcam(mut self) -> Self {
        self.include_gradcam = false;
        self
    }
}

/// Outcome of one prediction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    class_name: String,
    confidence: f64,
    explanation: String,
    gradcam: Option<String>,
    #[serde(skip)]
    finding: Option<Finding>,
}

impl PredictionResult {
    /// Name of the predicted class.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Probability of the predicted class, in `[0, 1]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Explanation sentence.
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Base64 PNG heatmap, absent when not requested or degenerate.
    pub fn gradcam(&self) -> Option<&str> {
        self.gradcam.as_deref()
    }

    /// Wording variant behind the explanation. Non-diagnostic.
    pub fn finding(&self) -> Option<Finding> {
        self.finding
    }

    /// Take the heatmap payload.
    pub fn into_gradcam(self) -> Option<String> {
        self.gradcam
    }
}

/// Class and full probability vector for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Predicted class (argmax, lowest index on ties).
    pub class: CardiacClass,
    /// Softmax over all classes.
    pub distribution: ClassDistribution,
}

impl Classification {
    /// Probability of the predicted class.
    pub fn confidence(&self) -> f64 {
        self.distribution.confidence()
    }
}

/// Runs preprocessing, classification, explanation and Grad-CAM for one
/// image per call.
///
/// Safe to share between threads: every call works on its own snapshot of
/// the classifier, so concurrent predictions cannot see each other's
/// activations or gradients. Only the explanation generator's random stream
/// is shared, behind a mutex.
pub struct Predictor<B: AutodiffBackend> {
    classifier: Arc<Classifier<B>>,
    preprocessor: Preprocessor,
    renderer: HeatmapRenderer,
    policy: ExplanationPolicy,
    rng: Mutex<ChaCha8Rng>,
}

impl<B: AutodiffBackend> Predictor<B> {
    /// Build a predictor around an already loaded classifier.
    ///
    /// `config.checkpoint` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::Config`] if the classifier does not have one
    /// output per [`CardiacClass`], or the stage configs are invalid.
    pub fn new(classifier: Arc<Classifier<B>>, config: &PredictorConfig) -> Result<Self> {
        if classifier.n_classes() != CardiacClass::COUNT {
            return Err(PredictionError::Config(format!(
                "classifier has {} outputs, expected {}",
                classifier.n_classes(),
                CardiacClass::COUNT
            )));
        }

        let seed = config.seed.map_or_else(Seed::from_entropy, Seed::new);
        Ok(Self {
            classifier,
            preprocessor: Preprocessor::new(config.preprocess.clone())?,
            renderer: HeatmapRenderer::new(config.heatmap.clone())?,
            policy: ExplanationPolicy::new(config.explanation.clone())?,
            rng: Mutex::new(seed.derive("explanation").to_rng()),
        })
    }

    /// Load the checkpoint named by `config` and build a predictor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Load`] if the checkpoint is missing or corrupt.
    pub fn load(config: &PredictorConfig, device: B::Device) -> Result<Self> {
        let classifier = Classifier::load(&config.checkpoint, device)?;
        tracing::info!(
            checkpoint = %config.checkpoint.display(),
            seeded = config.seed.is_some(),
            "predictor ready"
        );
        Self::new(Arc::new(classifier), config)
    }

    /// The shared classifier.
    pub fn classifier(&self) -> &Arc<Classifier<B>> {
        &self.classifier
    }

    /// Predict with default options.
    ///
    /// # Errors
    ///
    /// See [`Predictor::predict_with`].
    pub fn predict(&self, input: impl Into<ImageInput>) -> Result<PredictionResult> {
        self.predict_with(input, &PredictOptions::default())
    }

    /// Classify an image, explain the decision and render its heatmap.
    ///
    /// A degenerate saliency map or a failed heatmap encoding only drops the
    /// heatmap; the classification is still returned.
    ///
    /// # Errors
    ///
    /// - [`ModelError::InvalidTargetClass`] for an out-of-range
    ///   `options.target_class`, checked before any work is done.
    /// - Preprocessing errors for unreadable or undecodable input.
    /// - [`ModelError::Inference`] for numeric failures.
    pub fn predict_with(
        &self,
        input: impl Into<ImageInput>,
        options: &PredictOptions,
    ) -> Result<PredictionResult> {
        if let Some(target) = options.target_class {
            let n_classes = self.classifier.n_classes();
            if target >= n_classes {
                return Err(ModelError::InvalidTargetClass {
                    index: target,
                    n_classes,
                }
                .into());
            }
        }

        let evaluation = self.evaluate(input)?;
        let classification = self.classification(&evaluation)?;
        let confidence = classification.confidence();

        let explanation = self
            .policy
            .explain(classification.class, confidence, &mut *self.rng.lock());

        let gradcam = if options.include_gradcam {
            let target = options.target_class.unwrap_or(evaluation.predicted());
            self.heatmap(&evaluation, target)?
        } else {
            None
        };

        tracing::debug!(
            class = %classification.class,
            confidence,
            heatmap = gradcam.is_some(),
            "prediction complete"
        );

        Ok(PredictionResult {
            class_name: classification.class.name().to_string(),
            confidence,
            explanation: explanation.text().to_string(),
            gradcam,
            finding: explanation.finding(),
        })
    }

    /// Classify an image without explaining it.
    ///
    /// # Errors
    ///
    /// Preprocessing and inference errors as for [`Predictor::predict_with`].
    pub fn classify(&self, input: impl Into<ImageInput>) -> Result<Classification> {
        let evaluation = self.evaluate(input)?;
        self.classification(&evaluation)
    }

    fn evaluate(&self, input: impl Into<ImageInput>) -> Result<Evaluation<B>> {
        let image = self.preprocessor.process(input)?;
        let tensor = image.to_tensor::<B::InnerBackend>(self.classifier.device())?;
        Ok(self.classifier.evaluate(tensor)?)
    }

    fn classification(&self, evaluation: &Evaluation<B>) -> Result<Classification> {
        let class = CardiacClass::from_index(evaluation.predicted()).map_err(ModelError::from)?;
        Ok(Classification {
            class,
            distribution: evaluation.distribution().clone(),
        })
    }

    fn heatmap(&self, evaluation: &Evaluation<B>, target: usize) -> Result<Option<String>> {
        let gradient = evaluation.gradient(target)?;
        let map = match grad_cam(evaluation.activations(), gradient) {
            Ok(map) => map.with_target_class(target),
            Err(ExplainError::DegenerateSaliencyMap { max }) => {
                tracing::warn!(
                    target_class = target,
                    max,
                    "degenerate saliency map, omitting heatmap"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match self.renderer.encode(&map) {
            Ok(encoded) => Ok(Some(encoded)),
            Err(e) => {
                tracing::warn!(error = %e, "heatmap encoding failed, omitting heatmap");
                Ok(None)
            }
        }
    }
}

impl<B: AutodiffBackend> std::fmt::Debug for Predictor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("classifier", &self.classifier)
            .field("preprocessor", &self.preprocessor)
            .field("renderer", &self.renderer)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
