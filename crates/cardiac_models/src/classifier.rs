//! Shared classifier handle and per-request evaluations.

use std::path::Path;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use cardiac_core::{ClassDistribution, ImageTensor};
use parking_lot::Mutex;

use crate::checkpoint;
use crate::error::{ModelError, Result};
use crate::resnet::{CardiacResNet, CardiacResNetConfig, ForwardPass};

/// Loaded classifier parameters shared between requests.
///
/// The network runs on `B::InnerBackend`, so batch normalisation always uses
/// its running statistics. `B` itself is only used to differentiate the head
/// when a gradient is requested.
///
/// Parameters are never mutated after construction. The mutex only guards
/// taking a snapshot; each [`Evaluation`] owns its copy, so concurrent
/// requests never observe each other's captures.
pub struct Classifier<B: AutodiffBackend> {
    model: Mutex<CardiacResNet<B::InnerBackend>>,
    config: CardiacResNetConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Classifier<B> {
    /// Wrap an already-built network.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the network's head does not
    /// match `config`.
    pub fn new(
        model: CardiacResNet<B::InnerBackend>,
        config: CardiacResNetConfig,
        device: B::Device,
    ) -> Result<Self> {
        config.validate()?;
        if model.n_classes() != config.n_classes
            || model.feature_channels() != config.feature_channels()
        {
            return Err(ModelError::InvalidConfig(format!(
                "network head is {}x{}, configuration expects {}x{}",
                model.feature_channels(),
                model.n_classes(),
                config.feature_channels(),
                config.n_classes
            )));
        }
        Ok(Self {
            model: Mutex::new(model),
            config,
            device,
        })
    }

    /// Build a classifier with freshly initialised weights.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] for an invalid configuration.
    pub fn init(config: CardiacResNetConfig, device: B::Device) -> Result<Self> {
        config.validate()?;
        let model = config.init::<B::InnerBackend>(&device);
        Self::new(model, config, device)
    }

    /// Load a classifier from a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Load`] if the checkpoint is missing or corrupt.
    pub fn load(path: impl AsRef<Path>, device: B::Device) -> Result<Self> {
        let (model, config) = checkpoint::load_checkpoint::<B::InnerBackend>(path, &device)?;
        Self::new(model, config, device)
    }

    /// Architecture configuration.
    pub fn config(&self) -> &CardiacResNetConfig {
        &self.config
    }

    /// Number of output classes.
    pub fn n_classes(&self) -> usize {
        self.config.n_classes
    }

    /// Device the parameters live on.
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Private copy of the network.
    ///
    /// Parameter tensors are reference counted, so this does not copy weights.
    pub fn snapshot(&self) -> CardiacResNet<B::InnerBackend> {
        self.model.lock().clone()
    }

    /// Run the network on one image.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Inference`] if the image is too small for the
    /// backbone or the logits are not finite.
    pub fn evaluate(&self, image: ImageTensor<B::InnerBackend>) -> Result<Evaluation<B>> {
        let model = self.snapshot();
        let pass = model.forward(image)?;
        let logits = pass.logits_vec()?;
        let distribution = ClassDistribution::from_logits(&logits)
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        tracing::debug!(
            ?logits,
            predicted = distribution.argmax(),
            confidence = distribution.confidence(),
            "forward pass complete"
        );

        Ok(Evaluation {
            model,
            pass,
            distribution,
        })
    }
}

impl<B: AutodiffBackend> std::fmt::Debug for Classifier<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Result of one forward pass, owned by a single request.
#[derive(Debug)]
pub struct Evaluation<B: AutodiffBackend> {
    model: CardiacResNet<B::InnerBackend>,
    pass: ForwardPass<B::InnerBackend>,
    distribution: ClassDistribution,
}

impl<B: AutodiffBackend> Evaluation<B> {
    /// Softmax over the logits.
    pub fn distribution(&self) -> &ClassDistribution {
        &self.distribution
    }

    /// Index of the most probable class.
    pub fn predicted(&self) -> usize {
        self.distribution.argmax()
    }

    /// Logits and activation map.
    pub fn forward_pass(&self) -> &ForwardPass<B::InnerBackend> {
        &self.pass
    }

    /// Last-stage activation map, shape `(1, C, H, W)`.
    pub fn activations(&self) -> Tensor<B::InnerBackend, 4> {
        self.pass.activations.clone()
    }

    /// Gradient of the `target` logit with respect to the activation map.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTargetClass`] for an out-of-range target.
    pub fn gradient(&self, target: usize) -> Result<Tensor<B::InnerBackend, 4>> {
        self.model
            .target_gradient::<B>(self.pass.activations.clone(), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    fn tiny_config() -> CardiacResNetConfig {
        CardiacResNetConfig {
            n_classes: 2,
            layers: [1, 1, 1, 1],
            base_width: 4,
        }
    }

    fn classifier() -> Classifier<TestBackend> {
        Classifier::init(tiny_config(), Default::default()).unwrap()
    }

    fn image(fill: f32) -> ImageTensor<NdArray> {
        let values = (0..3 * 64 * 64).map(|i| fill + (i % 7) as f32 * 0.1).collect();
        ImageTensor::from_chw(values, 64, 64, &Default::default()).unwrap()
    }

    #[test]
    fn test_evaluate_produces_distribution() {
        let classifier = classifier();
        let eval = classifier.evaluate(image(0.0)).unwrap();

        let sum: f64 = eval.distribution().probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(eval.predicted() < 2);
        assert_eq!(eval.activations().dims(), [1, 128, 2, 2]);
    }

    #[test]
    fn test_gradient_shape_matches_activations() {
        let classifier = classifier();
        let eval = classifier.evaluate(image(0.5)).unwrap();
        let grad = eval.gradient(eval.predicted()).unwrap();
        assert_eq!(grad.dims(), eval.activations().dims());
    }

    #[test]
    fn test_gradient_rejects_unknown_class() {
        let classifier = classifier();
        let eval = classifier.evaluate(image(0.5)).unwrap();
        assert!(matches!(
            eval.gradient(7),
            Err(ModelError::InvalidTargetClass { index: 7, .. })
        ));
    }

    #[test]
    fn test_evaluations_are_independent() {
        let classifier = classifier();
        let a = classifier.evaluate(image(-1.0)).unwrap();
        let b = classifier.evaluate(image(1.0)).unwrap();
        let a_again = classifier.evaluate(image(-1.0)).unwrap();

        let values = |e: &Evaluation<TestBackend>| {
            e.activations().into_data().to_vec::<f32>().unwrap()
        };
        assert_eq!(values(&a), values(&a_again));
        assert_ne!(values(&a), values(&b));
    }

    #[test]
    fn test_rejects_mismatched_head() {
        let device = Default::default();
        let model = tiny_config().init::<NdArray>(&device);
        let config = CardiacResNetConfig {
            n_classes: 3,
            ..tiny_config()
        };
        let result = Classifier::<TestBackend>::new(model, config, device);
        assert!(matches!(result, Err(ModelError::InvalidConfig(_))));
    }
}
