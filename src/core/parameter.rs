//! Solver identifiers and training configuration

use crate::core::{LinearError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regularization/loss combination used to train a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverType {
    /// L2-regularized logistic regression (primal, trust-region Newton)
    L2rLr,
    /// L2-regularized L2-loss support vector classification (dual)
    L2rL2LossSvcDual,
    /// L2-regularized L2-loss support vector classification (primal)
    L2rL2LossSvc,
    /// L2-regularized L1-loss support vector classification (dual)
    L2rL1LossSvcDual,
    /// Multi-class support vector classification by Crammer and Singer
    McsvmCs,
    /// L1-regularized L2-loss support vector classification
    L1rL2LossSvc,
    /// L1-regularized logistic regression
    L1rLr,
    /// L2-regularized logistic regression (dual)
    L2rLrDual,
}

impl SolverType {
    /// Every solver, in model-file numbering order
    pub const ALL: [SolverType; 8] = [
        SolverType::L2rLr,
        SolverType::L2rL2LossSvcDual,
        SolverType::L2rL2LossSvc,
        SolverType::L2rL1LossSvcDual,
        SolverType::McsvmCs,
        SolverType::L1rL2LossSvc,
        SolverType::L1rLr,
        SolverType::L2rLrDual,
    ];

    /// Token used in the model text format
    pub fn name(self) -> &'static str {
        match self {
            SolverType::L2rLr => "L2R_LR",
            SolverType::L2rL2LossSvcDual => "L2R_L2LOSS_SVC_DUAL",
            SolverType::L2rL2LossSvc => "L2R_L2LOSS_SVC",
            SolverType::L2rL1LossSvcDual => "L2R_L1LOSS_SVC_DUAL",
            SolverType::McsvmCs => "MCSVM_CS",
            SolverType::L1rL2LossSvc => "L1R_L2LOSS_SVC",
            SolverType::L1rLr => "L1R_LR",
            SolverType::L2rLrDual => "L2R_LR_DUAL",
        }
    }

    /// Recommended stopping tolerance
    pub fn default_eps(self) -> f64 {
        match self {
            SolverType::L2rLr
            | SolverType::L2rL2LossSvc
            | SolverType::L1rL2LossSvc
            | SolverType::L1rLr => 0.01,
            SolverType::L2rL2LossSvcDual
            | SolverType::L2rL1LossSvcDual
            | SolverType::McsvmCs
            | SolverType::L2rLrDual => 0.1,
        }
    }

    /// Default cap on outer iterations
    pub fn default_max_iterations(self) -> usize {
        match self {
            SolverType::McsvmCs => 100_000,
            _ => 1000,
        }
    }

    /// Whether the model supports probability estimates
    pub fn is_logistic(self) -> bool {
        matches!(
            self,
            SolverType::L2rLr | SolverType::L1rLr | SolverType::L2rLrDual
        )
    }

    /// Whether the solver handles all classes in one joint problem
    pub fn is_multiclass_native(self) -> bool {
        self == SolverType::McsvmCs
    }
}

impl fmt::Display for SolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverType {
    type Err = LinearError;

    fn from_str(s: &str) -> Result<Self> {
        SolverType::ALL
            .iter()
            .copied()
            .find(|solver| solver.name() == s)
            .ok_or_else(|| LinearError::UnknownSolver(s.to_string()))
    }
}

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Solver to use
    pub solver_type: SolverType,
    /// Regularization strength (cost of constraint violation)
    pub c: f64,
    /// Stopping tolerance
    pub eps: f64,
    /// Cap on outer iterations, `None` uses the solver default
    pub max_iterations: Option<usize>,
    /// Per-class cost multipliers as `(label, weight)` pairs
    pub weights: Vec<(i32, f64)>,
}

impl Parameter {
    /// Create a configuration with no class weights
    pub fn new(solver_type: SolverType, c: f64, eps: f64) -> Self {
        Self {
            solver_type,
            c,
            eps,
            max_iterations: None,
            weights: Vec::new(),
        }
    }

    /// Configuration using the solver's recommended tolerance
    pub fn with_solver(solver_type: SolverType) -> Self {
        Self::new(solver_type, 1.0, solver_type.default_eps())
    }

    /// Set the cap on outer iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Add (or replace) the cost multiplier for one class label
    pub fn with_class_weight(mut self, label: i32, weight: f64) -> Self {
        match self.weights.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = weight,
            None => self.weights.push((label, weight)),
        }
        self
    }

    /// Effective cap on outer iterations
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
            .unwrap_or_else(|| self.solver_type.default_max_iterations())
    }

    /// Cost multiplier for `label` (1.0 when not configured)
    pub fn class_weight(&self, label: i32) -> f64 {
        self.weights
            .iter()
            .find(|(l, _)| *l == label)
            .map_or(1.0, |&(_, w)| w)
    }

    /// Reject configurations no solver can work with
    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(LinearError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(LinearError::InvalidParameter(format!(
                "eps must be positive, got {}",
                self.eps
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(LinearError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        for &(label, weight) in &self.weights {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(LinearError::InvalidParameter(format!(
                    "weight of class {label} must be positive, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self::with_solver(SolverType::L2rL2LossSvcDual)
    }
}
