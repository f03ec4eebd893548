//! Engine errors
//!
//! Two classes with different owners: `ValidationError` is the submitter's
//! problem and is shown to them verbatim; `ConfigurationError` means the
//! artifacts and the feature layout disagree and is the operator's problem.

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::Stage;

/// Raw feature input could not be turned into a vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required feature: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid value for {field}: '{value}' is not a number")]
    NotANumber { field: &'static str, value: String },

    #[error("Invalid value for {field}: '{value}' must be a finite number")]
    NotFinite { field: &'static str, value: String },
}

impl ValidationError {
    /// Layout name of the offending feature
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::NotANumber { field, .. }
            | Self::NotFinite { field, .. } => field,
        }
    }
}

/// Artifacts do not fit the layout or each other
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{component} expects {expected} values, got {actual}")]
    DimensionMismatch {
        component: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{artifact} feature order diverges from the layout at column {position}")]
    LayoutMismatch {
        artifact: &'static str,
        position: usize,
    },

    #[error("class index {index} is outside the label mapping (0..{known})")]
    UnknownClassIndex { index: usize, known: usize },

    #[error("classifier produced an invalid output: {0}")]
    InvalidOutput(String),

    #[error("invalid artifact {path}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigurationError {
    /// Pipeline stage this error aborts
    pub fn stage(&self) -> Stage {
        match self {
            Self::DimensionMismatch { component: "scaler", .. } => Stage::Scaling,
            Self::UnknownClassIndex { .. } => Stage::Decoding,
            Self::DimensionMismatch { .. } | Self::InvalidOutput(_) => Stage::Classifying,
            Self::LayoutMismatch { .. } | Self::InvalidArtifact { .. } | Self::Io { .. } => Stage::Idle,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
