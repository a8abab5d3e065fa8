//! # cardiac
//!
//! Cardiac scan classification with visual and textual explanations.
//!
//! A prediction runs one image through:
//!
//! - **Preprocessing**: decode, resize the shorter edge to 256, centre crop
//!   to 224, ImageNet standardisation
//! - **Classification**: ResNet-50 forward pass, softmax, argmax
//! - **Explanation**: templated text keyed on class and confidence
//! - **Grad-CAM**: gradient-weighted activation map of the last stage,
//!   rendered as a semi-transparent jet heatmap and base64 PNG
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cardiac::prelude::*;
//!
//! cardiac::logging::init_tracing(1);
//!
//! let cell = PredictorCell::<CpuBackend>::new(
//!     PredictorConfig::new("weights/best_model"),
//!     Default::default(),
//! );
//! let predictor = cell.get_or_load()?;
//!
//! let result = predictor.predict(ImageInput::from_path("scan.png"))?;
//! println!("{} ({:.2})", result.class_name(), result.confidence());
//! ```
//!
//! ## Feature Flags
//!
//! - `backend-ndarray` (default): CPU backend using ndarray

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod cell;
mod config;
mod error;
pub mod logging;
mod predictor;

// Re-export all crates
pub use cardiac_core as core;
pub use cardiac_explain as explain;
pub use cardiac_models as models;
pub use cardiac_transforms as transforms;

pub use cell::{PredictorCell, ServiceStatus};
pub use config::{PredictorConfig, DEFAULT_CHECKPOINT};
pub use error::{PredictionError, Result};
pub use predictor::{Classification, PredictOptions, PredictionResult, Predictor};

/// Predictor on the default CPU backend.
#[cfg(feature = "backend-ndarray")]
pub type CpuPredictor = Predictor<cardiac_core::backend::CpuBackend>;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use cardiac::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cardiac_core::{CardiacClass, ClassDistribution, ImageTensor, Seed};

    #[cfg(feature = "backend-ndarray")]
    pub use cardiac_core::backend::CpuBackend;

    // Preprocessing
    pub use cardiac_transforms::{ImageInput, PreprocessConfig, Preprocessor};

    // Models
    pub use cardiac_models::{CardiacResNet, CardiacResNetConfig, Classifier, ModelError};

    // Explainability
    pub use cardiac_explain::{
        grad_cam, Explanation, ExplanationConfig, ExplanationPolicy, Finding, HeatmapConfig,
        HeatmapRenderer, SaliencyMap,
    };

    // Pipeline
    pub use crate::{
        Classification, PredictOptions, PredictionError, PredictionResult, Predictor,
        PredictorCell, PredictorConfig, ServiceStatus,
    };
}
