//! Trained linear model and the prediction engine

use crate::core::{LinearError, Predictor, Result, SolverType, SparseVector};
use serde::{Deserialize, Serialize};

/// Trained linear classifier
///
/// Weights are stored feature-major: row `j` (0-based feature `j + 1`, the
/// bias row last when enabled) holds one weight per column, and column `k`
/// scores label `k`. Binary models from the one-vs-rest solvers keep a
/// single column; the second label scores its negation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    solver_type: SolverType,
    label: Vec<i32>,
    nr_feature: usize,
    bias: f64,
    w: Vec<f64>,
}

/// Number of stored weight columns for `nr_class` labels
pub fn weight_columns(solver_type: SolverType, nr_class: usize) -> usize {
    if nr_class == 2 && !solver_type.is_multiclass_native() {
        1
    } else {
        nr_class
    }
}

impl Model {
    /// Assemble a model, checking that the weight store has the right size
    pub fn from_parts(
        solver_type: SolverType,
        label: Vec<i32>,
        nr_feature: usize,
        bias: f64,
        w: Vec<f64>,
    ) -> Result<Self> {
        if label.is_empty() {
            return Err(LinearError::InvalidProblem(
                "model needs at least one label".to_string(),
            ));
        }
        if !bias.is_finite() {
            return Err(LinearError::InvalidProblem(format!(
                "bias must be finite, got {bias}"
            )));
        }
        let rows = nr_feature + usize::from(bias >= 0.0);
        let expected = rows * weight_columns(solver_type, label.len());
        if w.len() != expected {
            return Err(LinearError::DimensionMismatch {
                expected,
                actual: w.len(),
            });
        }
        Ok(Self {
            solver_type,
            label,
            nr_feature,
            bias,
            w,
        })
    }

    /// Solver that produced the model
    pub fn solver_type(&self) -> SolverType {
        self.solver_type
    }

    /// Distinct labels in stored order
    pub fn labels(&self) -> &[i32] {
        &self.label
    }

    /// Number of classes
    pub fn nr_class(&self) -> usize {
        self.label.len()
    }

    /// Feature dimensionality, excluding the bias feature
    pub fn nr_feature(&self) -> usize {
        self.nr_feature
    }

    /// Bias value, negative when disabled
    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn has_bias(&self) -> bool {
        self.bias >= 0.0
    }

    /// Number of stored weight columns
    pub fn nr_weight_columns(&self) -> usize {
        weight_columns(self.solver_type, self.label.len())
    }

    /// Number of stored weight rows (bias row included)
    pub fn nr_weight_rows(&self) -> usize {
        self.nr_feature + usize::from(self.has_bias())
    }

    /// Flat weight store, feature-major
    pub fn feature_weights(&self) -> &[f64] {
        &self.w
    }

    /// Weight of 1-based `feature` (`nr_feature + 1` is the bias) in `column`
    pub fn weight(&self, feature: usize, column: usize) -> Option<f64> {
        let nr_w = self.nr_weight_columns();
        if feature == 0 || feature > self.nr_weight_rows() || column >= nr_w {
            return None;
        }
        Some(self.w[(feature - 1) * nr_w + column])
    }

    /// Whether [`Model::predict_probability`] is supported
    pub fn supports_probability(&self) -> bool {
        self.solver_type.is_logistic()
    }

    /// Label picked by the decision values
    fn label_for(&self, dec: &[f64]) -> i32 {
        if self.nr_class() == 2 && dec.len() == 1 {
            return if dec[0] > 0.0 {
                self.label[0]
            } else {
                self.label[1]
            };
        }
        let mut best = 0;
        for (k, &v) in dec.iter().enumerate().skip(1) {
            if v > dec[best] {
                best = k;
            }
        }
        self.label[best]
    }

    /// Per-label probabilities for logistic models
    ///
    /// Binary: `[p, 1 - p]` with `p = 1 / (1 + exp(-dec))`. Multi-class: the
    /// per-column sigmoids normalized to sum to one.
    pub fn predict_probability(&self, x: &SparseVector) -> Result<(i32, Vec<f64>)> {
        if !self.supports_probability() {
            return Err(LinearError::InvalidParameter(format!(
                "probability output is only supported for logistic regression, not {}",
                self.solver_type
            )));
        }
        let dec = self.decision_values(x);
        let label = self.label_for(&dec);

        let mut prob: Vec<f64> = dec.iter().map(|&v| 1.0 / (1.0 + (-v).exp())).collect();
        if self.nr_class() == 2 && prob.len() == 1 {
            let p = prob[0];
            prob.push(1.0 - p);
        } else {
            let sum: f64 = prob.iter().sum();
            prob.iter_mut().for_each(|p| *p /= sum);
        }
        Ok((label, prob))
    }
}

impl Predictor for Model {
    fn decision_values(&self, x: &SparseVector) -> Vec<f64> {
        let nr_w = self.nr_weight_columns();
        let mut dec = vec![0.0; nr_w];
        for (index, value) in x.iter() {
            // features unseen in training carry no weight
            if index == 0 || index > self.nr_feature {
                continue;
            }
            let row = &self.w[(index - 1) * nr_w..index * nr_w];
            for (d, &wk) in dec.iter_mut().zip(row) {
                *d += wk * value;
            }
        }
        if self.has_bias() {
            let row = &self.w[self.nr_feature * nr_w..(self.nr_feature + 1) * nr_w];
            for (d, &wk) in dec.iter_mut().zip(row) {
                *d += wk * self.bias;
            }
        }
        dec
    }

    fn predict_label(&self, x: &SparseVector) -> i32 {
        self.label_for(&self.decision_values(x))
    }
}
