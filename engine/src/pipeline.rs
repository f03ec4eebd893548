//! Detector - scale → classify → decode
//!
//! The detector owns the fitted artifacts for the life of the process.
//! Build it once at startup and share it behind an `Arc`; it has no
//! mutating methods, so concurrent requests need no locking.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ConfigurationError;
use crate::features::{FeatureVector, LayoutInfo, FEATURE_COUNT};
use crate::model::{Classifier, LabelEncoder, ModelArtifacts, StandardScaler};

/// Confidence reported when the classifier has no probability estimates
pub const DEFAULT_CONFIDENCE: f64 = 95.0;

/// Per-request inference stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Validating,
    Scaling,
    Classifying,
    Decoding,
    Recording,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Scaling => "scaling",
            Self::Classifying => "classifying",
            Self::Decoding => "decoding",
            Self::Recording => "recording",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: String,
    pub class_index: usize,
    /// Percentage in [0, 100]
    pub confidence: f64,
    /// False when `confidence` is the fixed default
    pub calibrated: bool,
    pub probabilities: Option<Vec<f64>>,
    pub inference_time_us: u64,
}

impl Classification {
    /// Confidence with one decimal, e.g. `97.0%`
    pub fn confidence_display(&self) -> String {
        format!("{:.1}%", self.confidence)
    }
}

/// Loaded model status
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub model_kind: &'static str,
    pub classes: Vec<String>,
    pub probability: bool,
    pub layout: LayoutInfo,
    pub loaded_at: DateTime<Utc>,
}

pub struct Detector {
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
    labels: LabelEncoder,
    loaded_at: DateTime<Utc>,
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("model_kind", &self.classifier.kind())
            .field("classes", &self.labels.classes())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl Detector {
    /// Assemble a detector, rejecting artifacts that do not fit the layout
    /// or each other.
    pub fn new(
        scaler: StandardScaler,
        classifier: Box<dyn Classifier>,
        labels: LabelEncoder,
    ) -> Result<Self, ConfigurationError> {
        if scaler.n_features() != FEATURE_COUNT {
            return Err(ConfigurationError::DimensionMismatch {
                component: "scaler",
                expected: FEATURE_COUNT,
                actual: scaler.n_features(),
            });
        }
        if classifier.n_features() != FEATURE_COUNT {
            return Err(ConfigurationError::DimensionMismatch {
                component: "classifier",
                expected: FEATURE_COUNT,
                actual: classifier.n_features(),
            });
        }
        if classifier.n_classes() != labels.len() {
            return Err(ConfigurationError::DimensionMismatch {
                component: "label encoder",
                expected: classifier.n_classes(),
                actual: labels.len(),
            });
        }

        Ok(Self {
            scaler,
            classifier,
            labels,
            loaded_at: Utc::now(),
        })
    }

    /// Load the artifact directory and assemble
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let dir = dir.as_ref();
        let ModelArtifacts {
            scaler,
            classifier,
            labels,
        } = ModelArtifacts::load(dir)?;

        let path = dir.join(crate::model::artifacts::CLASSIFIER_FILE);
        let classifier = classifier
            .into_classifier()
            .map_err(|reason| ConfigurationError::invalid(path, reason))?;

        let detector = Self::new(scaler, classifier, labels)?;
        log::info!(
            "Detector ready: {} model, probability={}",
            detector.classifier.kind(),
            detector.classifier.has_probability()
        );
        Ok(detector)
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// Scale, classify and decode one vector
    pub fn classify(&self, vector: &FeatureVector) -> Result<Classification, ConfigurationError> {
        let start = Instant::now();

        log::debug!("stage={} vector={}", Stage::Scaling, vector.to_log_entry());
        let scaled = self.scaler.transform(vector)?;

        log::debug!("stage={}", Stage::Classifying);
        let raw = self.classifier.predict(scaled.view())?;

        let (confidence, calibrated) = match raw.probabilities.as_deref() {
            Some(probabilities) if !probabilities.is_empty() => {
                if probabilities.len() != self.labels.len() {
                    return Err(ConfigurationError::DimensionMismatch {
                        component: "probability vector",
                        expected: self.labels.len(),
                        actual: probabilities.len(),
                    });
                }
                let max = probabilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if !max.is_finite() {
                    return Err(ConfigurationError::InvalidOutput(
                        "non-finite class probability".to_string(),
                    ));
                }
                ((max * 100.0).clamp(0.0, 100.0), true)
            }
            _ => (DEFAULT_CONFIDENCE, false),
        };

        log::debug!("stage={} class_index={}", Stage::Decoding, raw.class_index);
        let label = self.labels.decode(raw.class_index)?.to_string();

        Ok(Classification {
            label,
            class_index: raw.class_index,
            confidence,
            calibrated,
            probabilities: raw.probabilities,
            inference_time_us: start.elapsed().as_micros() as u64,
        })
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            model_kind: self.classifier.kind(),
            classes: self.labels.classes().to_vec(),
            probability: self.classifier.has_probability(),
            layout: LayoutInfo::current(),
            loaded_at: self.loaded_at,
        }
    }
}
