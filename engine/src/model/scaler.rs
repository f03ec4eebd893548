//! Standard Scaler - fitted per-feature standardisation

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::features::FeatureVector;

/// Fitted scaler parameters.
///
/// `scale` is the per-feature standard deviation. A zero entry means the
/// feature was constant during fitting; it is treated as 1.0 so the
/// feature is only centred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column names the scaler was fitted on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ConfigurationError> {
        let scaler = Self {
            feature_names: None,
            mean,
            scale,
        };
        scaler.check()?;
        Ok(scaler)
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// `scaled[i] = (x[i] - mean[i]) / scale[i]`
    pub fn transform(&self, vector: &FeatureVector) -> Result<Array1<f64>, ConfigurationError> {
        let values = vector.as_slice();
        if values.len() != self.n_features() {
            return Err(ConfigurationError::DimensionMismatch {
                component: "scaler",
                expected: self.n_features(),
                actual: values.len(),
            });
        }

        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }

    pub(crate) fn check(&self) -> Result<(), ConfigurationError> {
        if self.scale.len() != self.mean.len() {
            return Err(ConfigurationError::DimensionMismatch {
                component: "scaler scale",
                expected: self.mean.len(),
                actual: self.scale.len(),
            });
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(ConfigurationError::InvalidOutput(
                "scaler parameters must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
