//! Resize, center-crop and standardise images for the classifier.
//!
//! The chain mirrors the statistics the backbone was trained with:
//! 1. resize so the shorter edge is [`RESIZE_SIZE`], keeping aspect ratio
//! 2. center crop to a [`CROP_SIZE`] square
//! 3. scale pixels to `[0, 1]`
//! 4. standardise each channel with the ImageNet mean/std
//!
//! Resizing before cropping guarantees the crop always fits and never
//! squashes the anatomy the way resizing straight to a square would.

use burn::prelude::*;
use cardiac_core::{ImageTensor, CROP_SIZE, INPUT_CHANNELS, RESIZE_SIZE};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::input::ImageInput;

/// ImageNet per-channel mean (RGB).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet per-channel standard deviation (RGB).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Configuration for the preprocessing chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Target length of the shorter edge after resizing.
    pub resize: u32,
    /// Side of the square center crop.
    pub crop: u32,
    /// Per-channel mean subtracted after scaling to `[0, 1]`.
    pub mean: [f32; 3],
    /// Per-channel standard deviation divided out after centering.
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            resize: RESIZE_SIZE,
            crop: CROP_SIZE,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

impl PreprocessConfig {
    /// Check the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidConfig`] if a size is zero, the crop
    /// is larger than the resize target, or a mean/std is not finite or a
    /// std is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.resize == 0 || self.crop == 0 {
            return Err(TransformError::InvalidConfig(
                "resize and crop must be positive".to_string(),
            ));
        }
        if self.crop > self.resize {
            return Err(TransformError::InvalidConfig(format!(
                "crop {} exceeds resize {}",
                self.crop, self.resize
            )));
        }
        for (i, (&m, &s)) in self.mean.iter().zip(&self.std).enumerate() {
            if !m.is_finite() || !s.is_finite() || s <= 0.0 {
                return Err(TransformError::InvalidConfig(format!(
                    "channel {i}: mean {m}, std {s}"
                )));
            }
        }
        Ok(())
    }
}

/// A preprocessed image in channel-major `(C, H, W)` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    values: Array3<f32>,
}

impl NormalizedImage {
    /// Normalised values, shape `(3, H, W)`.
    #[must_use]
    pub fn values(&self) -> &Array3<f32> {
        &self.values
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.len_of(Axis(2))
    }

    /// Mean of one channel, or `None` if the channel does not exist.
    #[must_use]
    pub fn channel_mean(&self, channel: usize) -> Option<f32> {
        if channel >= self.values.len_of(Axis(0)) {
            return None;
        }
        self.values.index_axis(Axis(0), channel).mean()
    }

    /// Convert to a `(1, 3, H, W)` network tensor on `device`.
    ///
    /// # Errors
    ///
    /// Propagates [`cardiac_core::CoreError::InvalidShape`] if the buffer is
    /// inconsistent with its dimensions.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Result<ImageTensor<B>> {
        let values = self.values.iter().copied().collect();
        Ok(ImageTensor::from_chw(
            values,
            self.height(),
            self.width(),
            device,
        )?)
    }
}

/// Deterministic image preprocessor.
///
/// The same input always yields the same [`NormalizedImage`].
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a preprocessor from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidConfig`] for unusable parameters.
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Decode any accepted input and run the full chain.
    ///
    /// # Errors
    ///
    /// Returns decode errors from [`ImageInput::into_rgb`] and
    /// [`TransformError::ImageDecode`] for empty images.
    pub fn process(&self, input: impl Into<ImageInput>) -> Result<NormalizedImage> {
        let input = input.into();
        tracing::trace!(kind = input.kind(), "decoding image input");
        let rgb = input.into_rgb()?;
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(TransformError::ImageDecode("image has no pixels".to_string()));
        }

        let resized = self.resize_shorter(&rgb);
        let cropped = self.center_crop(&resized);
        Ok(self.normalize(&cropped))
    }

    /// Resize so the shorter edge equals `config.resize`, preserving aspect
    /// ratio. The longer edge is `floor(resize * long / short)`.
    #[must_use]
    pub fn resize_shorter(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let (target_w, target_h) = shorter_edge_dims(width, height, self.config.resize);
        if (target_w, target_h) == (width, height) {
            return image.clone();
        }
        imageops::resize(image, target_w, target_h, FilterType::Triangle)
    }

    /// Crop the central `config.crop` square. Offsets round half to even.
    ///
    /// Images smaller than the crop are returned clipped to their own size.
    #[must_use]
    pub fn center_crop(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let crop_w = self.config.crop.min(width);
        let crop_h = self.config.crop.min(height);
        let left = crop_offset(width, crop_w);
        let top = crop_offset(height, crop_h);
        imageops::crop_imm(image, left, top, crop_w, crop_h).to_image()
    }

    /// Scale to `[0, 1]` and standardise each channel.
    #[must_use]
    pub fn normalize(&self, image: &RgbImage) -> NormalizedImage {
        let (width, height) = image.dimensions();
        let PreprocessConfig { mean, std, .. } = self.config;
        let values = Array3::from_shape_fn(
            (INPUT_CHANNELS, height as usize, width as usize),
            |(c, y, x)| {
                let pixel = image.get_pixel(x as u32, y as u32).0[c];
                (f32::from(pixel) / 255.0 - mean[c]) / std[c]
            },
        );
        NormalizedImage { values }
    }
}

fn shorter_edge_dims(width: u32, height: u32, size: u32) -> (u32, u32) {
    let scale_long = |long: u32, short: u32| {
        let scaled = u64::from(size) * u64::from(long) / u64::from(short);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    };
    if width <= height {
        (size, scale_long(height, width))
    } else {
        (scale_long(width, height), size)
    }
}

fn crop_offset(dim: u32, crop: u32) -> u32 {
    (f64::from(dim - crop) / 2.0).round_ties_even() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::{DynamicImage, Rgb};

    #[test]
    fn test_shorter_edge_dims() {
        assert_eq!(shorter_edge_dims(512, 512, 256), (256, 256));
        assert_eq!(shorter_edge_dims(640, 480, 256), (341, 256));
        assert_eq!(shorter_edge_dims(300, 1000, 256), (256, 853));
        assert_eq!(shorter_edge_dims(100, 50, 256), (512, 256));
    }

    #[test]
    fn test_crop_offset_rounds_half_to_even() {
        assert_eq!(crop_offset(256, 224), 16);
        assert_eq!(crop_offset(257, 224), 16);
        assert_eq!(crop_offset(259, 224), 18);
        assert_eq!(crop_offset(341, 224), 58);
    }

    #[test]
    fn test_output_shape_for_any_aspect_ratio() {
        let preprocessor = Preprocessor::default();
        for (w, h) in [(640, 480), (100, 900), (224, 224), (17, 23)] {
            let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([120, 60, 30])));
            let out = preprocessor.process(image).unwrap();
            assert_eq!(out.values().dim(), (3, 224, 224), "input {w}x{h}");
        }
    }

    #[test]
    fn test_white_image_statistics() {
        let preprocessor = Preprocessor::default();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(224, 224, Rgb([255, 255, 255])));
        let out = preprocessor.process(image).unwrap();

        for c in 0..3 {
            let expected = (1.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            let mean = out.channel_mean(c).unwrap();
            assert!((mean - expected).abs() < 1e-4, "channel {c}: {mean} vs {expected}");
        }
        assert!(out.channel_mean(3).is_none());
    }

    #[test]
    fn test_preprocessing_is_deterministic() {
        let preprocessor = Preprocessor::default();
        let image = RgbImage::from_fn(300, 260, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        let a = preprocessor.process(DynamicImage::ImageRgb8(image.clone())).unwrap();
        let b = preprocessor.process(DynamicImage::ImageRgb8(image)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_center_crop_takes_middle() {
        let preprocessor = Preprocessor::default();
        let image = RgbImage::from_fn(256, 300, |x, y| Rgb([x as u8, (y / 2) as u8, 0]));
        let cropped = preprocessor.center_crop(&image);
        assert_eq!(cropped.dimensions(), (224, 224));
        // left = 16, top = 38
        assert_eq!(cropped.get_pixel(0, 0).0, [16, 19, 0]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PreprocessConfig {
            crop: 300,
            ..Default::default()
        };
        assert!(matches!(
            Preprocessor::new(config),
            Err(TransformError::InvalidConfig(_))
        ));

        let config = PreprocessConfig {
            std: [0.2, 0.0, 0.2],
            ..Default::default()
        };
        assert!(Preprocessor::new(config).is_err());
    }

    #[test]
    fn test_to_tensor_shape() {
        let device = Default::default();
        let preprocessor = Preprocessor::default();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(256, 256, Rgb([0, 0, 0])));
        let tensor = preprocessor
            .process(image)
            .unwrap()
            .to_tensor::<NdArray>(&device)
            .unwrap();
        assert_eq!(tensor.inner().dims(), [1, 3, 224, 224]);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: PreprocessConfig = serde_json::from_str("{\"resize\": 288}").unwrap();
        assert_eq!(config.resize, 288);
        assert_eq!(config.crop, 224);
        assert_eq!(config.mean, IMAGENET_MEAN);
    }
}
