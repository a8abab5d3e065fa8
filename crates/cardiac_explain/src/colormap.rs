//! Heatmap rendering: jet colormap, transparency and PNG/base64 encoding.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::attribution::SaliencyMap;
use crate::error::{ExplainError, Result};

/// Number of entries in the quantised colormap.
const LUT_SIZE: usize = 256;

// Piecewise-linear control points `(x, value)` of matplotlib's jet map.
const JET_RED: &[(f32, f32)] = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: &[(f32, f32)] = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: &[(f32, f32)] = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

/// Rendering options for heatmaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Edge length of the square output image in pixels.
    pub size: u32,
    /// Opacity applied to every pixel, in `[0, 1]`.
    pub alpha: f32,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            size: cardiac_core::CROP_SIZE,
            alpha: 0.5,
        }
    }
}

impl HeatmapConfig {
    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::InvalidConfig`] for a zero size or an alpha
    /// outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(ExplainError::InvalidConfig("heatmap size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ExplainError::InvalidConfig(format!(
                "heatmap alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Map a value in `[0, 1]` to an RGB colour on the jet scale (blue to red).
///
/// The scale is quantised to 256 levels; out-of-range values are clamped.
pub fn jet(value: f32) -> [u8; 3] {
    let index = if value.is_nan() {
        0
    } else {
        ((value * LUT_SIZE as f32) as usize).min(LUT_SIZE - 1)
    };
    let x = index as f32 / (LUT_SIZE - 1) as f32;
    [
        to_byte(interpolate(JET_RED, x)),
        to_byte(interpolate(JET_GREEN, x)),
        to_byte(interpolate(JET_BLUE, x)),
    ]
}

fn interpolate(points: &[(f32, f32)], x: f32) -> f32 {
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
            return y0 + (y1 - y0) * t.clamp(0.0, 1.0);
        }
    }
    points.last().map_or(0.0, |&(_, y)| y)
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Renders saliency maps as standalone, semi-transparent colour images.
#[derive(Debug, Clone, Default)]
pub struct HeatmapRenderer {
    config: HeatmapConfig,
}

impl HeatmapRenderer {
    /// Create a renderer.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: HeatmapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Rendering options.
    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    /// Colour-map the saliency values, upsampling to the configured size
    /// first if needed. No axes or borders are drawn.
    pub fn render(&self, map: &SaliencyMap) -> RgbaImage {
        let size = self.config.size;
        let side = size as usize;
        let resized;
        let map = if map.dims() == (side, side) {
            map
        } else {
            resized = map.upsample(side, side);
            &resized
        };

        let alpha = to_byte(self.config.alpha);
        let values = map.values();
        RgbaImage::from_fn(size, size, |x, y| {
            let [r, g, b] = jet(values[[y as usize, x as usize]]);
            Rgba([r, g, b, alpha])
        })
    }

    /// Render and encode as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::Encode`] if PNG encoding fails.
    pub fn encode_png(&self, map: &SaliencyMap) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.render(map)
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|e| ExplainError::Encode(e.to_string()))?;
        Ok(bytes.into_inner())
    }

    /// Render and encode as a base64 PNG payload.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::Encode`] if PNG encoding fails.
    pub fn encode(&self, map: &SaliencyMap) -> Result<String> {
        Ok(STANDARD.encode(self.encode_png(map)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::normalize;
    use ndarray::Array2;

    fn gradient_map() -> SaliencyMap {
        normalize(Array2::from_shape_fn((7, 7), |(y, x)| (y + x) as f32)).unwrap()
    }

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0.0), [0, 0, 128]);
        assert_eq!(jet(1.0), [128, 0, 0]);
        assert_eq!(jet(2.0), jet(1.0));
        assert_eq!(jet(-1.0), jet(0.0));
    }

    #[test]
    fn test_jet_midpoint_is_green() {
        let [r, g, b] = jet(0.5);
        assert_eq!(g, 255);
        assert!((100..150).contains(&r));
        assert!((100..150).contains(&b));
    }

    #[test]
    fn test_render_size_and_alpha() {
        let image = HeatmapRenderer::default().render(&gradient_map());
        assert_eq!(image.dimensions(), (224, 224));
        assert!(image.pixels().all(|p| p.0[3] == 128));
        // Cold corner is blue, hot corner is red.
        assert!(image.get_pixel(0, 0).0[2] > image.get_pixel(0, 0).0[0]);
        assert!(image.get_pixel(223, 223).0[0] > image.get_pixel(223, 223).0[2]);
    }

    #[test]
    fn test_encode_is_decodable_png() {
        let renderer = HeatmapRenderer::new(HeatmapConfig {
            size: 32,
            alpha: 1.0,
        })
        .unwrap();
        let payload = renderer.encode(&gradient_map()).unwrap();

        let bytes = STANDARD.decode(payload).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (32, 32));
        assert!(decoded.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_invalid_config() {
        assert!(HeatmapRenderer::new(HeatmapConfig { size: 0, alpha: 0.5 }).is_err());
        assert!(HeatmapRenderer::new(HeatmapConfig { size: 8, alpha: 1.5 }).is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: HeatmapConfig = serde_json::from_str(r#"{"alpha": 0.3}"#).unwrap();
        assert_eq!(config.size, 224);
        assert_eq!(config.alpha, 0.3);
    }
}
