//! Artifact loading
//!
//! The training job writes three JSON files next to each other. They are
//! read once at startup; nothing here is called on the request path.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use super::classifier::ClassifierArtifact;
use super::labels::LabelEncoder;
use super::scaler::StandardScaler;
use crate::error::ConfigurationError;
use crate::features::layout::first_divergence;

pub const SCALER_FILE: &str = "preprocessor.json";
pub const CLASSIFIER_FILE: &str = "nids_model.json";
pub const LABELS_FILE: &str = "label_encoder.json";

/// The three parsed artifacts, not yet cross-checked
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub scaler: StandardScaler,
    pub classifier: ClassifierArtifact,
    pub labels: LabelEncoder,
}

impl ModelArtifacts {
    /// Read and parse all artifacts from `dir`
    pub fn load(dir: &Path) -> Result<Self, ConfigurationError> {
        let scaler: StandardScaler = read_json(&dir.join(SCALER_FILE))?;
        if let Some(position) = scaler.feature_names.as_deref().and_then(first_divergence) {
            return Err(ConfigurationError::LayoutMismatch {
                artifact: SCALER_FILE,
                position,
            });
        }
        scaler.check()?;

        let classifier: ClassifierArtifact = read_json(&dir.join(CLASSIFIER_FILE))?;
        if let Some(position) = classifier.feature_names().and_then(first_divergence) {
            return Err(ConfigurationError::LayoutMismatch {
                artifact: CLASSIFIER_FILE,
                position,
            });
        }

        let labels: LabelEncoder = read_json(&dir.join(LABELS_FILE))?;
        labels.check()?;

        log::info!(
            "Loaded model artifacts from {} ({} classes)",
            dir.display(),
            labels.len()
        );

        Ok(Self {
            scaler,
            classifier,
            labels,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigurationError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|e| ConfigurationError::invalid(path, e.to_string()))
}
