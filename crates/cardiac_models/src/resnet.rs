//! ResNet-50 style classifier for cardiac scans.
//!
//! The backbone is the standard 50-layer bottleneck design (conv stem, four
//! residual stages, global average pooling); only the linear head depends on
//! the task. Layer names follow the usual `conv1/bn1/layer1..4/fc` layout so
//! converted torchvision weights map onto the record one to one.

use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{MaxPool2d, MaxPool2dConfig},
    BatchNorm, BatchNormConfig, Initializer, Linear, LinearConfig, PaddingConfig2d,
};
use burn::prelude::*;
use burn::tensor::activation::relu;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::TensorData;
use cardiac_core::{CardiacClass, ImageTensor};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Output channels of a bottleneck relative to its inner width.
const EXPANSION: usize = 4;

/// Total spatial downsampling of the backbone.
const TOTAL_STRIDE: usize = 32;

/// Configuration for [`CardiacResNet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardiacResNetConfig {
    /// Number of output classes.
    pub n_classes: usize,
    /// Bottleneck blocks in each of the four stages.
    pub layers: [usize; 4],
    /// Inner width of the first stage; later stages double it.
    pub base_width: usize,
}

impl Default for CardiacResNetConfig {
    fn default() -> Self {
        Self::resnet50(CardiacClass::COUNT)
    }
}

impl CardiacResNetConfig {
    /// Standard ResNet-50 with `n_classes` outputs.
    #[must_use]
    pub fn resnet50(n_classes: usize) -> Self {
        Self {
            n_classes,
            layers: [3, 4, 6, 3],
            base_width: 64,
        }
    }

    /// Channels of the last-stage activation map.
    #[must_use]
    pub fn feature_channels(&self) -> usize {
        self.base_width * 8 * EXPANSION
    }

    /// Check the configuration can build a network.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] for zero classes, zero width or an
    /// empty stage.
    pub fn validate(&self) -> Result<()> {
        if self.n_classes == 0 {
            return Err(ModelError::InvalidConfig("n_classes must be positive".into()));
        }
        if self.base_width == 0 {
            return Err(ModelError::InvalidConfig("base_width must be positive".into()));
        }
        if self.layers.iter().any(|&n| n == 0) {
            return Err(ModelError::InvalidConfig(format!(
                "every stage needs at least one block, got {:?}",
                self.layers
            )));
        }
        Ok(())
    }

    /// Initialize the model with random weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> CardiacResNet<B> {
        CardiacResNet::new(self, LinearConfig::new(self.feature_channels(), self.n_classes), device)
    }

    /// Initialize the model with an all-zero classification head.
    ///
    /// Every input then scores all classes equally.
    pub fn init_with_zero_head<B: Backend>(&self, device: &B::Device) -> CardiacResNet<B> {
        let head = LinearConfig::new(self.feature_channels(), self.n_classes)
            .with_initializer(Initializer::Zeros);
        CardiacResNet::new(self, head, device)
    }
}

/// 1x1 projection on the residual path when shape changes.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Bottleneck residual block: 1x1 reduce, 3x3 (strided), 1x1 expand.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    conv3: Conv2d<B>,
    bn3: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> Bottleneck<B> {
    /// Create a block reading `in_channels` and producing `width * 4`.
    pub fn new(in_channels: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let out_channels = width * EXPANSION;
        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, device));

        Self {
            conv1: Conv2dConfig::new([in_channels, width], [1, 1])
                .with_bias(false)
                .init(device),
            bn1: BatchNormConfig::new(width).init(device),
            conv2: Conv2dConfig::new([width, width], [3, 3])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .init(device),
            bn2: BatchNormConfig::new(width).init(device),
            conv3: Conv2dConfig::new([width, out_channels], [1, 1])
                .with_bias(false)
                .init(device),
            bn3: BatchNormConfig::new(out_channels).init(device),
            downsample,
        }
    }

    /// Forward pass.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = relu(self.bn1.forward(self.conv1.forward(x.clone())));
        let out = relu(self.bn2.forward(self.conv2.forward(out)));
        let out = self.bn3.forward(self.conv3.forward(out));

        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(x),
            None => x,
        };

        relu(out + identity)
    }
}

/// Captures from one forward pass, owned by the caller.
#[derive(Debug, Clone)]
pub struct ForwardPass<B: Backend> {
    /// Unnormalised class scores, shape `(1, n_classes)`.
    pub logits: Tensor<B, 2>,
    /// Last-stage activation map, shape `(1, C, H, W)`.
    pub activations: Tensor<B, 4>,
}

impl<B: Backend> ForwardPass<B> {
    /// Copy the logits to the host.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Inference`] if the tensor cannot be read as `f32`.
    pub fn logits_vec(&self) -> Result<Vec<f32>> {
        self.logits
            .clone()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ModelError::Inference(format!("reading logits: {e:?}")))
    }
}

/// ResNet-50 style cardiac scan classifier.
#[derive(Module, Debug)]
pub struct CardiacResNet<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    maxpool: MaxPool2d,
    layer1: Vec<Bottleneck<B>>,
    layer2: Vec<Bottleneck<B>>,
    layer3: Vec<Bottleneck<B>>,
    layer4: Vec<Bottleneck<B>>,
    fc: Linear<B>,
}

impl<B: Backend> CardiacResNet<B> {
    fn new(config: &CardiacResNetConfig, head: LinearConfig, device: &B::Device) -> Self {
        let stem_width = config.base_width;
        let conv1 = Conv2dConfig::new([cardiac_core::INPUT_CHANNELS, stem_width], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(stem_width).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut in_channels = stem_width;
        let mut stages = Vec::with_capacity(4);
        for (i, &blocks) in config.layers.iter().enumerate() {
            let width = config.base_width << i;
            let stride = if i == 0 { 1 } else { 2 };
            let mut stage = Vec::with_capacity(blocks);
            for b in 0..blocks {
                let block_stride = if b == 0 { stride } else { 1 };
                stage.push(Bottleneck::new(in_channels, width, block_stride, device));
                in_channels = width * EXPANSION;
            }
            stages.push(stage);
        }
        let mut stages = stages.into_iter();
        let mut next_stage = || stages.next().unwrap_or_default();

        Self {
            conv1,
            bn1,
            maxpool,
            layer1: next_stage(),
            layer2: next_stage(),
            layer3: next_stage(),
            layer4: next_stage(),
            fc: head.init(device),
        }
    }

    /// Number of output classes.
    pub fn n_classes(&self) -> usize {
        self.fc.weight.val().dims()[1]
    }

    /// Channels of the last-stage activation map.
    pub fn feature_channels(&self) -> usize {
        self.fc.weight.val().dims()[0]
    }

    /// Run the backbone up to the last convolutional stage.
    pub fn features(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.bn1.forward(self.conv1.forward(x)));
        let mut x = self.maxpool.forward(x);
        for block in self
            .layer1
            .iter()
            .chain(&self.layer2)
            .chain(&self.layer3)
            .chain(&self.layer4)
        {
            x = block.forward(x);
        }
        x
    }

    /// Forward pass returning both the logits and the activation map.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Inference`] if the image is too small to survive
    /// the backbone's downsampling.
    pub fn forward(&self, input: ImageTensor<B>) -> Result<ForwardPass<B>> {
        let shape = input.shape();
        if shape.height() < TOTAL_STRIDE || shape.width() < TOTAL_STRIDE {
            return Err(ModelError::Inference(format!(
                "input {shape} is smaller than the backbone stride {TOTAL_STRIDE}"
            )));
        }

        let activations = self.features(input.into_inner());
        let logits = head_logits(
            activations.clone(),
            self.fc.weight.val(),
            self.fc.bias.as_ref().map(|b| b.val()),
        );

        Ok(ForwardPass {
            logits,
            activations,
        })
    }

    /// Gradient of logit `target` with respect to `activations`.
    ///
    /// The head is re-run on the autodiff backend `A` with the activation map
    /// as a leaf tensor, and a one-hot vector selecting `target` is
    /// backpropagated. The backbone stays on the inner backend, so batch
    /// normalisation keeps using its running statistics.
    ///
    /// # Errors
    ///
    /// - [`ModelError::InvalidTargetClass`] if `target >= n_classes`.
    /// - [`ModelError::Inference`] if no gradient reaches the activation map.
    pub fn target_gradient<A>(
        &self,
        activations: Tensor<B, 4>,
        target: usize,
    ) -> Result<Tensor<B, 4>>
    where
        A: AutodiffBackend<InnerBackend = B>,
    {
        let n_classes = self.n_classes();
        if target >= n_classes {
            return Err(ModelError::InvalidTargetClass {
                index: target,
                n_classes,
            });
        }

        let activations = Tensor::<A, 4>::from_inner(activations).require_grad();
        let weight = Tensor::<A, 2>::from_inner(self.fc.weight.val());
        let bias = self
            .fc
            .bias
            .as_ref()
            .map(|b| Tensor::<A, 1>::from_inner(b.val()));
        let logits = head_logits(activations.clone(), weight, bias);

        let mut one_hot = vec![0.0f32; n_classes];
        one_hot[target] = 1.0;
        let one_hot = TensorData::new(one_hot, [1, n_classes]);
        let one_hot = Tensor::<A, 2>::from_data(one_hot, &logits.device());

        let grads = (logits * one_hot).sum().backward();
        activations
            .grad(&grads)
            .ok_or_else(|| ModelError::Inference("no gradient reached the activation map".into()))
    }
}

/// Global average pooling followed by the linear projection.
fn head_logits<T: Backend>(
    activations: Tensor<T, 4>,
    weight: Tensor<T, 2>,
    bias: Option<Tensor<T, 1>>,
) -> Tensor<T, 2> {
    let pooled: Tensor<T, 2> = activations.mean_dim(3).mean_dim(2).flatten(1, 3);
    let logits = pooled.matmul(weight);
    match bias {
        Some(bias) => logits + bias.unsqueeze(),
        None => logits,
    }
}
