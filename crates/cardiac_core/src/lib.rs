//! # cardiac_core
//!
//! Core types shared by the cardiac scan classification crates.
//!
//! This crate provides:
//! - [`CardiacClass`] for the enumerated diagnosis classes
//! - [`ClassDistribution`] for softmax outputs and their argmax
//! - [`ImageShape`] and [`ImageTensor`] for network inputs
//! - [`Seed`] for deterministic random number generation
//! - Error types and backend aliases
//!
//! ## Shape Convention
//!
//! Image tensors follow the convention `(B, C, H, W)`:
//! - `B`: Batch size (always 1 for inference)
//! - `C`: Color channels (3, RGB)
//! - `H`, `W`: Height and width in pixels
//!
//! ## Example
//!
//! ```rust
//! use cardiac_core::{CardiacClass, ClassDistribution};
//!
//! let dist = ClassDistribution::from_logits(&[0.0, 2.0]).unwrap();
//! assert_eq!(CardiacClass::from_index(dist.argmax()).unwrap(), CardiacClass::Abnormal);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod class;
mod distribution;
mod error;
mod seed;
mod shape;
mod tensor;

pub use class::CardiacClass;
pub use distribution::ClassDistribution;
pub use error::{CoreError, Result};
pub use seed::Seed;
pub use shape::{ImageShape, CROP_SIZE, INPUT_CHANNELS, RESIZE_SIZE};
pub use tensor::ImageTensor;

/// Backend type aliases for convenience
pub mod backend {
    #[cfg(feature = "backend-ndarray")]
    pub use burn_ndarray::NdArray;

    #[cfg(feature = "backend-ndarray")]
    pub use burn_autodiff::Autodiff;

    /// CPU backend with autodiff, used for the gradient half of Grad-CAM.
    #[cfg(feature = "backend-ndarray")]
    pub type CpuBackend = Autodiff<NdArray>;
}
