//! # cardiac_explain
//!
//! Explainability for cardiac scan predictions.
//!
//! This crate provides:
//! - Grad-CAM saliency maps computed from activation and gradient values
//! - Bilinear upsampling to display resolution
//! - Jet colormap rendering with transparency, encoded as base64 PNG
//! - The explanation text policy
//!
//! ## Example
//!
//! ```rust,ignore
//! use cardiac_explain::{grad_cam, HeatmapRenderer};
//!
//! let map = grad_cam(activations, gradients)?.with_target_class(1);
//! let png_base64 = HeatmapRenderer::default().encode(&map)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod attribution;
mod colormap;
mod error;
mod narrative;

pub use attribution::{grad_cam, normalize, upsample_bilinear, SaliencyMap};
pub use colormap::{jet, HeatmapConfig, HeatmapRenderer};
pub use error::{ExplainError, Result};
pub use narrative::{Explanation, ExplanationConfig, ExplanationPolicy, Finding};
