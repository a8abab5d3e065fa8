//! # cardiac_models
//!
//! The cardiac scan classifier network.
//!
//! - [`CardiacResNet`] - ResNet-50 style bottleneck backbone with a
//!   replaceable linear head
//! - [`ForwardPass`] - logits and last-stage activation map, returned as values
//! - [`Classifier`] - shared, read-only handle over loaded parameters that
//!   hands each request its own [`Evaluation`]
//! - [`checkpoint`] - saving and loading parameters with their configuration

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
mod classifier;
mod error;
pub mod resnet;

pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointMetadata};
pub use classifier::{Classifier, Evaluation};
pub use error::{ModelError, Result};
pub use resnet::{Bottleneck, CardiacResNet, CardiacResNetConfig, ForwardPass};
