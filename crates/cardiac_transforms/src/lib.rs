//! # cardiac_transforms
//!
//! Image input handling and preprocessing for the cardiac classifier.
//!
//! This crate provides:
//! - [`ImageInput`]: the three accepted input forms (path, bytes, decoded)
//! - [`Preprocessor`]: resize-shorter-edge, center crop, scale and
//!   per-channel standardisation into a `(1, 3, 224, 224)` tensor
//!
//! ## Example
//!
//! ```rust,ignore
//! use cardiac_transforms::{ImageInput, Preprocessor};
//!
//! let preprocessor = Preprocessor::default();
//! let image = preprocessor.process(ImageInput::from_path("scan.png"))?;
//! let tensor = image.to_tensor::<NdArray>(&device)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub mod input;
pub mod preprocess;

pub use error::{Result, TransformError};
pub use input::ImageInput;
pub use preprocess::{NormalizedImage, PreprocessConfig, Preprocessor, IMAGENET_MEAN, IMAGENET_STD};
