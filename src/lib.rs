//! Large-scale sparse linear classification
//!
//! L2- and L1-regularized logistic regression, L2-regularized linear support
//! vector classification (primal and dual) and Crammer–Singer multi-class
//! SVM, trained by coordinate descent or trust-region Newton methods.

pub mod api;
pub mod core;
pub mod data;
pub mod model;
pub mod persistence;
pub mod solver;
pub mod train;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{CrossValidation, EvaluationMetrics, LinearClassifier, TrainedModel};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{LinearError, Parameter, Result, SolverType};
pub use crate::data::SparseMatrix;
pub use crate::model::Model;
pub use crate::train::cross_validation::cross_validation;
pub use crate::train::{train, Trainer};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
