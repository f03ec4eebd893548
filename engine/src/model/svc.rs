//! Support Vector Classifier - one-vs-one multi-class SVM
//!
//! Parameters follow the libsvm layout (the one scikit-learn's `SVC` keeps
//! internally):
//!
//! - `support_vectors` grouped by class, `n_support[c]` rows per class
//! - `dual_coef` has `k - 1` rows, one column per support vector
//! - `intercept` has one entry per class pair `(i, j)`, `i < j`, in order
//! - `prob_a` / `prob_b` are the optional Platt sigmoid per pair
//!
//! Signs are the libsvm ones (`-rho` as intercept). For binary models this
//! is the *unflipped* `_dual_coef_` / `_intercept_`, not the public
//! attributes.
//!
//! - Prediction: pairwise decision `f_ij(x) = Σ coef·K(sv, x) + b_ij`, a
//!   positive value votes for `i`, the most voted class wins (lowest index
//!   on ties).
//! - Probability: Platt-scaled pairwise estimates combined by pairwise
//!   coupling (Wu, Lin & Weng 2004, method 2). A binary model uses its
//!   single clipped estimate directly, as libsvm does.

use ndarray::ArrayView1;
use serde::Deserialize;

use super::classifier::{check_width, Classifier, RawPrediction};
use crate::error::ConfigurationError;

/// Pairwise probabilities are clipped into [MIN_PROB, 1 - MIN_PROB]
const MIN_PROB: f64 = 1e-7;

/// Kernel function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Linear,
    Poly,
    Rbf,
    Sigmoid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupportVectorClassifier {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub kernel: Kernel,
    #[serde(default)]
    pub gamma: f64,
    #[serde(default)]
    pub coef0: f64,
    #[serde(default = "default_degree")]
    pub degree: i32,
    pub n_support: Vec<usize>,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default)]
    pub prob_a: Option<Vec<f64>>,
    #[serde(default)]
    pub prob_b: Option<Vec<f64>>,
}

fn default_degree() -> i32 {
    3
}

impl SupportVectorClassifier {
    fn n_pairs(&self) -> usize {
        let k = self.n_support.len();
        k * (k.saturating_sub(1)) / 2
    }

    /// Shape checks run once at load
    pub fn check(&self) -> Result<(), String> {
        let k = self.n_support.len();
        if k < 2 {
            return Err(format!("SVC needs at least 2 classes, got {}", k));
        }

        let total: usize = self.n_support.iter().sum();
        if total == 0 || total != self.support_vectors.len() {
            return Err(format!(
                "n_support sums to {} but {} support vectors are stored",
                total,
                self.support_vectors.len()
            ));
        }

        let width = self.support_vectors[0].len();
        if width == 0 || self.support_vectors.iter().any(|sv| sv.len() != width) {
            return Err("support vectors must share one non-zero width".to_string());
        }

        if self.dual_coef.len() != k - 1 || self.dual_coef.iter().any(|row| row.len() != total) {
            return Err(format!("dual_coef must be {} x {}", k - 1, total));
        }

        let pairs = self.n_pairs();
        if self.intercept.len() != pairs {
            return Err(format!(
                "intercept must have {} entries, got {}",
                pairs,
                self.intercept.len()
            ));
        }

        match (&self.prob_a, &self.prob_b) {
            (None, None) => {}
            (Some(a), Some(b)) if a.len() == pairs && b.len() == pairs => {}
            _ => return Err(format!("prob_a and prob_b must both hold {} entries", pairs)),
        }

        if self.kernel != Kernel::Linear && !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(format!("gamma must be positive for {:?} kernel", self.kernel));
        }

        Ok(())
    }

    fn kernel_value(&self, x: &ArrayView1<'_, f64>, sv: &[f64]) -> f64 {
        let sv = ArrayView1::from(sv);
        match self.kernel {
            Kernel::Linear => x.dot(&sv),
            Kernel::Poly => (self.gamma * x.dot(&sv) + self.coef0).powi(self.degree),
            Kernel::Rbf => {
                let sq_dist: f64 = x.iter().zip(sv.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
                (-self.gamma * sq_dist).exp()
            }
            Kernel::Sigmoid => (self.gamma * x.dot(&sv) + self.coef0).tanh(),
        }
    }

    /// One decision value per class pair, in `(0,1), (0,2), .., (k-2,k-1)` order
    pub fn decision_values(&self, x: ArrayView1<'_, f64>) -> Vec<f64> {
        let k = self.n_support.len();
        let kvalues: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| self.kernel_value(&x, sv))
            .collect();

        let mut starts = Vec::with_capacity(k);
        let mut offset = 0;
        for count in &self.n_support {
            starts.push(offset);
            offset += count;
        }

        let mut values = Vec::with_capacity(self.n_pairs());
        for i in 0..k {
            for j in (i + 1)..k {
                let coef_i = &self.dual_coef[j - 1];
                let coef_j = &self.dual_coef[i];
                let range_i = starts[i]..starts[i] + self.n_support[i];
                let range_j = starts[j]..starts[j] + self.n_support[j];

                let sum: f64 = range_i.map(|s| coef_i[s] * kvalues[s]).sum::<f64>()
                    + range_j.map(|s| coef_j[s] * kvalues[s]).sum::<f64>();

                values.push(sum + self.intercept[values.len()]);
            }
        }
        values
    }

    fn vote(&self, decisions: &[f64]) -> usize {
        let k = self.n_support.len();
        let mut votes = vec![0usize; k];
        let mut p = 0;
        for i in 0..k {
            for j in (i + 1)..k {
                if decisions[p] > 0.0 {
                    votes[i] += 1;
                } else {
                    votes[j] += 1;
                }
                p += 1;
            }
        }

        let mut best = 0;
        for (class, count) in votes.iter().enumerate() {
            if *count > votes[best] {
                best = class;
            }
        }
        best
    }

    fn probabilities(&self, decisions: &[f64]) -> Option<Vec<f64>> {
        let (prob_a, prob_b) = match (&self.prob_a, &self.prob_b) {
            (Some(a), Some(b)) => (a, b),
            _ => return None,
        };

        let k = self.n_support.len();
        let mut pairwise = vec![vec![0.0f64; k]; k];
        let mut p = 0;
        for i in 0..k {
            for j in (i + 1)..k {
                let r = sigmoid_predict(decisions[p], prob_a[p], prob_b[p]).clamp(MIN_PROB, 1.0 - MIN_PROB);
                pairwise[i][j] = r;
                pairwise[j][i] = 1.0 - r;
                p += 1;
            }
        }

        if k == 2 {
            return Some(vec![pairwise[0][1], pairwise[1][0]]);
        }
        Some(pairwise_coupling(&pairwise))
    }
}

impl Classifier for SupportVectorClassifier {
    fn kind(&self) -> &'static str {
        "svc"
    }

    fn n_features(&self) -> usize {
        self.support_vectors.first().map(Vec::len).unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        self.n_support.len()
    }

    fn has_probability(&self) -> bool {
        self.prob_a.is_some() && self.prob_b.is_some()
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<RawPrediction, ConfigurationError> {
        check_width("svc", self.n_features(), &x)?;

        let decisions = self.decision_values(x);
        if decisions.iter().any(|d| !d.is_finite()) {
            return Err(ConfigurationError::InvalidOutput(
                "non-finite decision value".to_string(),
            ));
        }

        Ok(RawPrediction {
            class_index: self.vote(&decisions),
            probabilities: self.probabilities(&decisions),
        })
    }
}

/// Platt sigmoid `1 / (1 + exp(A·f + B))`, evaluated without overflow
fn sigmoid_predict(decision: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision * a + b;
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Combine pairwise estimates `r[i][j] ≈ P(i | i or j)` into one
/// distribution by minimising `Σ_i Σ_{j≠i} (r[j][i]·p[i] - r[i][j]·p[j])²`.
fn pairwise_coupling(r: &[Vec<f64>]) -> Vec<f64> {
    let k = r.len();
    let max_iter = 100.max(k);
    let eps = 0.005 / k as f64;

    let mut q = vec![vec![0.0f64; k]; k];
    for t in 0..k {
        for j in 0..k {
            if j != t {
                q[t][t] += r[j][t] * r[j][t];
                q[t][j] = -r[j][t] * r[t][j];
            }
        }
    }

    let mut p = vec![1.0 / k as f64; k];
    let mut qp = vec![0.0f64; k];

    for _ in 0..max_iter {
        let mut pqp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            pqp += p[t] * qp[t];
        }

        let max_error = qp.iter().map(|v| (v - pqp).abs()).fold(0.0f64, f64::max);
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + pqp) / q[t][t];
            p[t] += diff;
            pqp = (pqp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
    }

    p
}
