//! Saving and loading classifier parameters.
//!
//! A checkpoint is two files sharing a stem: `<stem>.mpk` holds the named
//! MessagePack record written by Burn's [`NamedMpkFileRecorder`], and
//! `<stem>.json` holds [`CheckpointMetadata`] with the architecture
//! configuration needed to rebuild the network before the record is applied.
//!
//! # Example
//!
//! ```rust,ignore
//! use cardiac_models::{checkpoint, CardiacResNetConfig};
//!
//! let config = CardiacResNetConfig::default();
//! let model = config.init::<NdArray>(&device);
//! checkpoint::save_checkpoint(&model, &config, "weights/cardiac")?;
//!
//! let (model, config) = checkpoint::load_checkpoint::<NdArray>("weights/cardiac", &device)?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use cardiac_core::CardiacClass;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::resnet::{CardiacResNet, CardiacResNetConfig, CardiacResNetRecord};

/// Architecture tag written into every checkpoint.
pub const ARCH: &str = "cardiac-resnet50";

/// Extension of the metadata sidecar.
const METADATA_EXTENSION: &str = "json";

/// Model checkpoint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Model architecture name.
    pub arch: String,
    /// Configuration the record was produced with.
    pub config: CardiacResNetConfig,
    /// Class names in output order.
    pub classes: Vec<String>,
    /// Additional metadata.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl CheckpointMetadata {
    /// Create metadata for a model built from `config`.
    pub fn new(config: &CardiacResNetConfig) -> Self {
        let classes = if config.n_classes == CardiacClass::COUNT {
            CardiacClass::ALL.iter().map(|c| c.name().to_string()).collect()
        } else {
            (0..config.n_classes).map(|i| format!("class_{i}")).collect()
        };
        Self {
            arch: ARCH.to_string(),
            config: config.clone(),
            classes,
            extra: HashMap::new(),
        }
    }

    /// Add extra metadata.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Save metadata to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Save`] if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let save_err = |reason: String| ModelError::Save {
            path: path.to_path_buf(),
            reason,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| save_err(e.to_string()))
    }

    /// Load metadata from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Load`] if the file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_err = |reason: String| ModelError::Load {
            path: path.to_path_buf(),
            reason,
        };
        let json = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| load_err(e.to_string()))
    }
}

/// Strip any extension so `weights.mpk` and `weights` name the same checkpoint.
fn checkpoint_stem(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Path of the metadata sidecar for a checkpoint.
pub fn metadata_path(path: impl AsRef<Path>) -> PathBuf {
    checkpoint_stem(path.as_ref()).with_extension(METADATA_EXTENSION)
}

/// Save model parameters and configuration.
///
/// # Errors
///
/// Returns [`ModelError::Save`] if either file cannot be written.
pub fn save_checkpoint<B: Backend>(
    model: &CardiacResNet<B>,
    config: &CardiacResNetConfig,
    path: impl AsRef<Path>,
) -> Result<()> {
    let stem = checkpoint_stem(path.as_ref());
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(model.clone().into_record(), stem.clone())
        .map_err(|e| ModelError::Save {
            path: stem.clone(),
            reason: e.to_string(),
        })?;
    CheckpointMetadata::new(config).save(metadata_path(&stem))?;

    tracing::info!(path = %stem.display(), "saved checkpoint");
    Ok(())
}

/// Rebuild the network from a checkpoint.
///
/// # Errors
///
/// Returns [`ModelError::Load`] if the metadata or record is missing,
/// corrupt, for another architecture, or shaped differently from the
/// recorded configuration.
pub fn load_checkpoint<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(CardiacResNet<B>, CardiacResNetConfig)> {
    let stem = checkpoint_stem(path.as_ref());
    let load_err = |reason: String| ModelError::Load {
        path: stem.clone(),
        reason,
    };

    let metadata = CheckpointMetadata::load(metadata_path(&stem))?;
    if metadata.arch != ARCH {
        return Err(load_err(format!(
            "unsupported architecture '{}', expected '{ARCH}'",
            metadata.arch
        )));
    }
    let config = metadata.config;
    config.validate().map_err(|e| load_err(e.to_string()))?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record: CardiacResNetRecord<B> = recorder
        .load(stem.clone(), device)
        .map_err(|e| load_err(e.to_string()))?;

    // Burn asserts on stage length mismatches while applying a record.
    let depths = [
        record.layer1.len(),
        record.layer2.len(),
        record.layer3.len(),
        record.layer4.len(),
    ];
    if depths != config.layers {
        return Err(load_err(format!(
            "record has stage depths {depths:?}, configuration expects {:?}",
            config.layers
        )));
    }
    let model = config.init::<B>(device).load_record(record);

    let expected = [config.feature_channels(), config.n_classes];
    let got = [model.feature_channels(), model.n_classes()];
    if got != expected {
        return Err(load_err(format!(
            "head has shape {got:?}, configuration expects {expected:?}"
        )));
    }

    tracing::info!(
        path = %stem.display(),
        n_classes = config.n_classes,
        "loaded checkpoint"
    );
    Ok((model, config))
}
