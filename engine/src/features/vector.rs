//! Feature Vector - validated model input
//!
//! Built only through `from_raw` (form input) or `from_values` (already
//! numeric). Either way the values are in `FEATURE_LAYOUT` order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::layout::{layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
use crate::error::ValidationError;

/// Versioned flow feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create from raw values with current version
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Validate raw string input keyed by feature name.
    ///
    /// Every layout name must be present and parse as a finite `f64`
    /// (negative and scientific notation accepted, surrounding whitespace
    /// ignored). Keys outside the layout are ignored. Fields are checked in
    /// layout order and the first failure is returned.
    pub fn from_raw<S: AsRef<str>>(raw: &HashMap<String, S>) -> Result<Self, ValidationError> {
        let mut values = [0.0f64; FEATURE_COUNT];

        for (slot, &field) in values.iter_mut().zip(FEATURE_LAYOUT) {
            let text = raw
                .get(field)
                .map(|v| v.as_ref().trim())
                .filter(|v| !v.is_empty())
                .ok_or(ValidationError::MissingField { field })?;

            let value: f64 = text.parse().map_err(|_| ValidationError::NotANumber {
                field,
                value: text.to_string(),
            })?;

            if !value.is_finite() {
                return Err(ValidationError::NotFinite {
                    field,
                    value: text.to_string(),
                });
            }

            *slot = value;
        }

        Ok(Self::from_values(values))
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Named values for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<HashMap<_, _>>(),
        })
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}
