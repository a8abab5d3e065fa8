//! Network input tensor wrapper.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::{CoreError, Result};
use crate::shape::{ImageShape, INPUT_CHANNELS};

/// A single normalised image ready for the classifier.
///
/// Wraps a Burn tensor and guarantees the `(1, 3, H, W)` layout: inference is
/// single-image only and the network is RGB.
#[derive(Debug, Clone)]
pub struct ImageTensor<B: Backend> {
    inner: Tensor<B, 4>,
    shape: ImageShape,
}

impl<B: Backend> ImageTensor<B> {
    /// Wrap an existing tensor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidShape`] unless the tensor is `(1, 3, H, W)`
    /// with non-zero spatial size.
    pub fn new(tensor: Tensor<B, 4>) -> Result<Self> {
        let shape = ImageShape::from_dims(&tensor.dims())?;
        if shape.batch() != 1
            || shape.channels() != INPUT_CHANNELS
            || shape.height() == 0
            || shape.width() == 0
        {
            return Err(CoreError::InvalidShape {
                expected: format!("(1, {INPUT_CHANNELS}, H, W)"),
                got: shape.to_string(),
            });
        }
        Ok(Self {
            inner: tensor,
            shape,
        })
    }

    /// Build a tensor from channel-major (`C, H, W`) values, adding the batch
    /// dimension.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidShape`] if `values` does not hold
    /// `3 * height * width` elements.
    pub fn from_chw(
        values: Vec<f32>,
        height: usize,
        width: usize,
        device: &B::Device,
    ) -> Result<Self> {
        let shape = ImageShape::new(1, INPUT_CHANNELS, height, width);
        if values.len() != shape.numel() {
            return Err(CoreError::InvalidShape {
                expected: format!("{} values for {shape}", shape.numel()),
                got: format!("{} values", values.len()),
            });
        }
        let data = TensorData::new(values, shape.as_array());
        Self::new(Tensor::from_data(data, device))
    }

    /// Shape metadata.
    #[must_use]
    pub const fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Borrow the underlying Burn tensor.
    #[must_use]
    pub const fn inner(&self) -> &Tensor<B, 4> {
        &self.inner
    }

    /// Consume self and return the underlying Burn tensor.
    #[must_use]
    pub fn into_inner(self) -> Tensor<B, 4> {
        self.inner
    }

    /// Device the tensor lives on.
    pub fn device(&self) -> B::Device {
        self.inner.device()
    }
}
