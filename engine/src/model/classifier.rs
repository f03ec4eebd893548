//! Classifier seam
//!
//! Anything that maps a scaled vector to a class index can serve requests.
//! Fitted models deserialize through `ClassifierArtifact`; tests plug in
//! their own implementations.

use ndarray::ArrayView1;
use serde::Deserialize;

use super::logistic::LogisticRegression;
use super::svc::SupportVectorClassifier;
use crate::error::ConfigurationError;

/// Output of a single prediction
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub class_index: usize,
    /// Probability per class, when the model can estimate it
    pub probabilities: Option<Vec<f64>>,
}

/// Fitted decision function. Implementations are immutable after
/// construction and shared across request handlers.
pub trait Classifier: Send + Sync {
    /// Short model family name for status output
    fn kind(&self) -> &'static str;

    /// Expected input width
    fn n_features(&self) -> usize;

    /// Number of classes the model can emit
    fn n_classes(&self) -> usize;

    /// Whether `predict` fills `probabilities`
    fn has_probability(&self) -> bool;

    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<RawPrediction, ConfigurationError>;
}

/// On-disk classifier artifact, tagged by model family
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    Svc(SupportVectorClassifier),
    Logistic(LogisticRegression),
}

impl ClassifierArtifact {
    /// Column names declared by the artifact, if any
    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            Self::Svc(m) => m.feature_names.as_deref(),
            Self::Logistic(m) => m.feature_names.as_deref(),
        }
    }

    /// Check internal shapes and box the model
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, String> {
        match self {
            Self::Svc(m) => {
                m.check()?;
                Ok(Box::new(m))
            }
            Self::Logistic(m) => {
                m.check()?;
                Ok(Box::new(m))
            }
        }
    }
}

/// Shared input-width guard
pub(crate) fn check_width(
    component: &'static str,
    expected: usize,
    x: &ArrayView1<'_, f64>,
) -> Result<(), ConfigurationError> {
    if x.len() != expected {
        return Err(ConfigurationError::DimensionMismatch {
            component,
            expected,
            actual: x.len(),
        });
    }
    Ok(())
}
