//! Logistic Regression - linear model with calibrated probabilities
//!
//! `coef` holds one row per class (multinomial softmax). A single row is
//! the binary form: `P(class 1) = sigmoid(w·x + b)`.

use ndarray::ArrayView1;
use serde::Deserialize;

use super::classifier::{check_width, Classifier, RawPrediction};
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticRegression {
    pub fn check(&self) -> Result<(), String> {
        let width = self.coef.first().map(Vec::len).unwrap_or(0);
        if width == 0 || self.coef.iter().any(|row| row.len() != width) {
            return Err("coef rows must share one non-zero width".to_string());
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "intercept must have {} entries, got {}",
                self.coef.len(),
                self.intercept.len()
            ));
        }
        if self.coef.len() == 2 {
            return Err("two-class models use the single-row binary form".to_string());
        }
        Ok(())
    }

    fn scores(&self, x: &ArrayView1<'_, f64>) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| x.dot(&ArrayView1::from(row.as_slice())) + b)
            .collect()
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        if self.coef.len() == 1 {
            2
        } else {
            self.coef.len()
        }
    }

    fn has_probability(&self) -> bool {
        true
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<RawPrediction, ConfigurationError> {
        check_width("logistic", self.n_features(), &x)?;

        let scores = self.scores(&x);
        let probabilities = if scores.len() == 1 {
            let p1 = 1.0 / (1.0 + (-scores[0]).exp());
            vec![1.0 - p1, p1]
        } else {
            softmax(&scores)
        };

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ConfigurationError::InvalidOutput(
                "non-finite class probability".to_string(),
            ));
        }

        let mut best = 0;
        for (class, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = class;
            }
        }

        Ok(RawPrediction {
            class_index: best,
            probabilities: Some(probabilities),
        })
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
