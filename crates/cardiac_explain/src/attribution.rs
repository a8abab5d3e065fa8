//! Grad-CAM attribution maps.

use burn::prelude::*;
use burn::tensor::TensorData;
use ndarray::Array2;

use crate::error::{ExplainError, Result};

/// Class activation map normalised to `[0, 1]`.
///
/// Unless constructed from a degenerate map (which [`normalize`] rejects), the
/// maximum value is exactly `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    values: Array2<f32>,
    target_class: Option<usize>,
}

impl SaliencyMap {
    /// Set the class the map explains.
    #[must_use]
    pub fn with_target_class(mut self, class: usize) -> Self {
        self.target_class = Some(class);
        self
    }

    /// Class the map explains, if recorded.
    pub fn target_class(&self) -> Option<usize> {
        self.target_class
    }

    /// Values in row-major `(height, width)` layout.
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// `(height, width)` of the map.
    pub fn dims(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Largest value in the map.
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Resample to `height x width` with bilinear interpolation.
    #[must_use]
    pub fn upsample(&self, height: usize, width: usize) -> Self {
        Self {
            values: upsample_bilinear(&self.values, height, width),
            target_class: self.target_class,
        }
    }
}

/// Compute Grad-CAM from a last-stage activation map and the gradient of the
/// target logit with respect to it.
///
/// Both tensors have shape `(1, C, H, W)`. Channel weights are the spatial
/// means of the gradient; the weighted channel sum is rectified and divided by
/// its maximum.
///
/// # Errors
///
/// - [`ExplainError::InvalidShape`] if the shapes differ or the batch is not 1.
/// - [`ExplainError::DegenerateSaliencyMap`] if no location scores above zero.
/// - [`ExplainError::Readback`] if the map cannot be read as `f32`.
pub fn grad_cam<B: Backend>(
    activations: Tensor<B, 4>,
    gradients: Tensor<B, 4>,
) -> Result<SaliencyMap> {
    let dims = activations.dims();
    if dims != gradients.dims() || dims[0] != 1 {
        return Err(ExplainError::InvalidShape {
            expected: format!("two tensors of shape (1, C, H, W), activations are {dims:?}"),
            got: format!("{:?}", gradients.dims()),
        });
    }
    let [_, _, height, width] = dims;

    // (1, C, H, W) -> (1, C, 1, 1)
    let weights = gradients.mean_dim(3).mean_dim(2);

    // Weighted channel sum: (1, C, H, W) -> (1, 1, H, W)
    let cam = (activations * weights).sum_dim(1).clamp_min(0.0);

    normalize(host_map(cam.into_data(), height, width)?)
}

/// Copy a `(1, 1, H, W)` map to the host as `(H, W)`.
fn host_map(data: TensorData, height: usize, width: usize) -> Result<Array2<f32>> {
    let values = data
        .to_vec::<f32>()
        .map_err(|e| ExplainError::Readback(format!("{e:?}")))?;
    Array2::from_shape_vec((height, width), values).map_err(|e| ExplainError::InvalidShape {
        expected: format!("{height}x{width} map"),
        got: e.to_string(),
    })
}

/// Divide a rectified map by its maximum.
///
/// # Errors
///
/// Returns [`ExplainError::DegenerateSaliencyMap`] if the maximum is not a
/// positive finite number or any value is not finite.
pub fn normalize(raw: Array2<f32>) -> Result<SaliencyMap> {
    if let Some(&bad) = raw.iter().find(|v| !v.is_finite()) {
        return Err(ExplainError::DegenerateSaliencyMap { max: bad });
    }
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max <= 0.0 {
        return Err(ExplainError::DegenerateSaliencyMap { max });
    }

    Ok(SaliencyMap {
        values: raw.mapv(|v| (v.max(0.0) / max).min(1.0)),
        target_class: None,
    })
}

/// Bilinear resize with half-pixel centres and edge clamping.
///
/// Equivalent to `align_corners = false` interpolation; output values stay
/// within the range of the input.
pub fn upsample_bilinear(src: &Array2<f32>, height: usize, width: usize) -> Array2<f32> {
    let (src_h, src_w) = src.dim();
    if src_h == 0 || src_w == 0 {
        return Array2::zeros((height, width));
    }

    let rows: Vec<_> = (0..height).map(|y| sample_axis(y, height, src_h)).collect();
    let cols: Vec<_> = (0..width).map(|x| sample_axis(x, width, src_w)).collect();

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (y0, y1, ly) = rows[y];
        let (x0, x1, lx) = cols[x];
        let top = src[[y0, x0]] * (1.0 - lx) + src[[y0, x1]] * lx;
        let bottom = src[[y1, x0]] * (1.0 - lx) + src[[y1, x1]] * lx;
        top * (1.0 - ly) + bottom * ly
    })
}

/// Source neighbours and blend factor for output index `i`.
fn sample_axis(i: usize, out_len: usize, in_len: usize) -> (usize, usize, f32) {
    let scale = in_len as f32 / out_len as f32;
    let pos = ((i as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (pos.floor() as usize).min(in_len - 1);
    let i1 = (i0 + 1).min(in_len - 1);
    let frac = if i1 == i0 { 0.0 } else { pos - i0 as f32 };
    (i0, i1, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ndarray::array;

    type TestBackend = NdArray;

    fn tensor(values: Vec<f32>, shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_grad_cam_weights_channels_by_mean_gradient() {
        // Channel 0 lights the top-left, channel 1 the bottom-right.
        let activations = tensor(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0], [1, 2, 2, 2]);
        // Channel 0 supports the class, channel 1 opposes it.
        let gradients = tensor(vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0], [1, 2, 2, 2]);

        let map = grad_cam(activations, gradients).unwrap();
        assert_eq!(map.values(), &array![[1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(map.max(), 1.0);
    }

    #[test]
    fn test_grad_cam_max_is_exactly_one() {
        let activations = (0..36).map(|i| (i % 5) as f32 * 0.3).collect();
        let gradients = (0..36).map(|i| (i % 3) as f32 * 0.01 + 0.001).collect();
        let activations = tensor(activations, [1, 4, 3, 3]);
        let gradients = tensor(gradients, [1, 4, 3, 3]);

        let map = grad_cam(activations, gradients).unwrap();
        assert_eq!(map.dims(), (3, 3));
        assert_eq!(map.max(), 1.0);
        assert!(map.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_zero_gradient_is_degenerate() {
        let activations = tensor(vec![1.0; 8], [1, 2, 2, 2]);
        let gradients = tensor(vec![0.0; 8], [1, 2, 2, 2]);
        let err = grad_cam(activations, gradients).unwrap_err();
        assert!(matches!(err, ExplainError::DegenerateSaliencyMap { max } if max == 0.0));
    }

    #[test]
    fn test_opposing_gradient_is_degenerate() {
        let activations = tensor(vec![1.0; 8], [1, 2, 2, 2]);
        let gradients = tensor(vec![-0.5; 8], [1, 2, 2, 2]);
        assert!(grad_cam(activations, gradients).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let activations = tensor(vec![1.0; 8], [1, 2, 2, 2]);
        let gradients = tensor(vec![1.0; 4], [1, 1, 2, 2]);
        assert!(matches!(
            grad_cam(activations, gradients),
            Err(ExplainError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_host_map_reports_readback_failure() {
        let ints = TensorData::new(vec![1i64, 0, 0, 2], [1, 1, 2, 2]);
        let err = host_map(ints, 2, 2).unwrap_err();
        assert!(matches!(err, ExplainError::Readback(_)));
        assert!(!err.to_string().contains("encoding"));

        let floats = TensorData::new(vec![1.0f32, 0.0, 0.0, 2.0], [1, 1, 2, 2]);
        assert_eq!(host_map(floats, 2, 2).unwrap(), array![[1.0, 0.0], [0.0, 2.0]]);
    }

    #[test]
    fn test_normalize_rejects_nan() {
        let raw = array![[0.5, f32::NAN], [0.0, 1.0]];
        assert!(matches!(
            normalize(raw),
            Err(ExplainError::DegenerateSaliencyMap { .. })
        ));
    }

    #[test]
    fn test_upsample_half_pixel_centres() {
        let src = array![[0.0, 1.0]];
        let up = upsample_bilinear(&src, 1, 4);
        assert_eq!(up, array![[0.0, 0.25, 0.75, 1.0]]);
    }

    #[test]
    fn test_upsample_constant_and_range() {
        let constant = Array2::from_elem((7, 7), 0.4f32);
        let up = upsample_bilinear(&constant, 224, 224);
        assert_eq!(up.dim(), (224, 224));
        assert!(up.iter().all(|&v| (v - 0.4).abs() < 1e-6));

        let map = normalize(Array2::from_shape_fn((7, 7), |(y, x)| (y * 7 + x) as f32)).unwrap();
        let up = map.with_target_class(1).upsample(224, 224);
        assert_eq!(up.dims(), (224, 224));
        assert_eq!(up.target_class(), Some(1));
        assert!(up.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(up.values()[[223, 223]], 1.0);
        assert_eq!(up.values()[[0, 0]], 0.0);
    }
}
