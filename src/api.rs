//! High-level API for linear classification
//!
//! This module wraps configuration, training, prediction and evaluation
//! behind a small builder.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rlinear::api::LinearClassifier;
//! use rlinear::SolverType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = LinearClassifier::new()
//!     .with_solver(SolverType::L2rLr)
//!     .with_c(4.0)
//!     .with_bias(1.0)
//!     .train_from_file("train.libsvm")?;
//!
//! println!("Accuracy: {:.2}%", model.evaluate_from_file("test.libsvm")? * 100.0);
//! model.save("train.model")?;
//! # Ok(())
//! # }
//! ```

use crate::core::{Parameter, Prediction, Predictor, Problem, Result, SolverType, SparseVector};
use crate::data::read_instance_weights;
use crate::model::Model;
use crate::train::Trainer;
use crate::utils::rng::DEFAULT_SEED;
use std::collections::BTreeMap;
use std::path::Path;

/// Builder for training linear classifiers
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    param: Parameter,
    eps_set: bool,
    bias: f64,
    seed: u64,
}

impl LinearClassifier {
    /// Default solver (`L2R_L2LOSS_SVC_DUAL`), C = 1, no bias
    pub fn new() -> Self {
        Self {
            param: Parameter::default(),
            eps_set: false,
            bias: -1.0,
            seed: DEFAULT_SEED,
        }
    }

    /// Pick the solver; the tolerance follows the solver default unless set
    pub fn with_solver(mut self, solver_type: SolverType) -> Self {
        self.param.solver_type = solver_type;
        if !self.eps_set {
            self.param.eps = solver_type.default_eps();
        }
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.param.c = c;
        self
    }

    /// Set stopping tolerance
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.param.eps = eps;
        self.eps_set = true;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.param = self.param.with_max_iterations(max_iterations);
        self
    }

    /// Multiply C by `weight` for instances of class `label`
    pub fn with_class_weight(mut self, label: i32, weight: f64) -> Self {
        self.param = self.param.with_class_weight(label, weight);
        self
    }

    /// Bias feature value used by the `*_from_file` methods (negative disables)
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Seed for sweep orders and fold assignment
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn parameter(&self) -> &Parameter {
        &self.param
    }

    /// Train on an in-memory problem
    pub fn train(&self, problem: &Problem) -> Result<TrainedModel> {
        let model = Trainer::with_seed(self.seed).train(problem, &self.param)?;
        Ok(TrainedModel { model })
    }

    /// Train from a libsvm-format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<TrainedModel> {
        let problem = Problem::from_libsvm_file(path, self.bias)?;
        self.train(&problem)
    }

    /// Train from a libsvm-format file with per-instance weights read from
    /// `weights_path` (one value per line)
    pub fn train_from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        path: P,
        weights_path: Q,
    ) -> Result<TrainedModel> {
        let weights = read_instance_weights(weights_path)?;
        let problem = Problem::from_libsvm_file(path, self.bias)?.with_weights(weights)?;
        self.train(&problem)
    }

    /// Held-out predictions from `nr_fold`-fold cross-validation
    pub fn cross_validate(&self, problem: &Problem, nr_fold: usize) -> Result<CrossValidation> {
        let predictions =
            Trainer::with_seed(self.seed).cross_validation(problem, &self.param, nr_fold)?;
        let metrics = EvaluationMetrics::from_predictions(&problem.y, &predictions);
        Ok(CrossValidation {
            predictions,
            metrics,
        })
    }
}

impl Default for LinearClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a cross-validation run
#[derive(Debug, Clone)]
pub struct CrossValidation {
    /// Held-out prediction for every instance, in input order
    pub predictions: Vec<i32>,
    pub metrics: EvaluationMetrics,
}

impl CrossValidation {
    pub fn accuracy(&self) -> f64 {
        self.metrics.accuracy()
    }
}

/// Trained model with the high-level prediction interface
#[derive(Debug, Clone)]
pub struct TrainedModel {
    model: Model,
}

impl TrainedModel {
    /// Predict a single instance
    pub fn predict(&self, x: &SparseVector) -> Prediction {
        self.model.predict(x)
    }

    /// Predict every instance of a problem
    pub fn predict_problem(&self, problem: &Problem) -> Vec<i32> {
        self.model.predict_batch(&problem.x)
    }

    /// Label and per-label probabilities (logistic solvers only)
    pub fn predict_probability(&self, x: &SparseVector) -> Result<(i32, Vec<f64>)> {
        self.model.predict_probability(x)
    }

    /// Accuracy on a labeled problem
    pub fn evaluate(&self, problem: &Problem) -> f64 {
        self.model.accuracy(problem)
    }

    /// Accuracy on a libsvm-format file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<f64> {
        let problem = Problem::from_libsvm_file(path, self.model.bias())?;
        Ok(self.evaluate(&problem))
    }

    /// Confusion counts and per-class scores on a labeled problem
    pub fn evaluate_detailed(&self, problem: &Problem) -> EvaluationMetrics {
        EvaluationMetrics::from_predictions(&problem.y, &self.predict_problem(problem))
    }

    /// Save in the model text format
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.model.save(path)
    }

    /// Load a model saved in the text format
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            model: Model::load(path)?,
        })
    }

    /// Get the underlying model
    pub fn inner(&self) -> &Model {
        &self.model
    }

    pub fn into_inner(self) -> Model {
        self.model
    }
}

impl From<Model> for TrainedModel {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

/// Confusion counts over labeled predictions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationMetrics {
    /// `(actual, predicted) -> count`
    pub confusion: BTreeMap<(i32, i32), usize>,
    pub total: usize,
}

impl EvaluationMetrics {
    /// Tally `predicted` against `actual`, pairwise
    pub fn from_predictions(actual: &[i32], predicted: &[i32]) -> Self {
        let mut metrics = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            *metrics.confusion.entry((a, p)).or_insert(0) += 1;
            metrics.total += 1;
        }
        metrics
    }

    /// Number of instances of class `actual` predicted as `predicted`
    pub fn count(&self, actual: i32, predicted: i32) -> usize {
        self.confusion.get(&(actual, predicted)).copied().unwrap_or(0)
    }

    /// Every label seen as actual or predicted, ascending
    pub fn labels(&self) -> Vec<i32> {
        let mut labels: Vec<i32> = self
            .confusion
            .keys()
            .flat_map(|&(a, p)| [a, p])
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Fraction of correct predictions
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let correct: usize = self
            .confusion
            .iter()
            .filter(|((a, p), _)| a == p)
            .map(|(_, &n)| n)
            .sum();
        correct as f64 / self.total as f64
    }

    /// Precision for `label`: correct / predicted as `label`
    pub fn precision(&self, label: i32) -> f64 {
        let predicted: usize = self
            .confusion
            .iter()
            .filter(|((_, p), _)| *p == label)
            .map(|(_, &n)| n)
            .sum();
        ratio(self.count(label, label), predicted)
    }

    /// Recall for `label`: correct / actually `label`
    pub fn recall(&self, label: i32) -> f64 {
        let actual: usize = self
            .confusion
            .iter()
            .filter(|((a, _), _)| *a == label)
            .map(|(_, &n)| n)
            .sum();
        ratio(self.count(label, label), actual)
    }

    /// Harmonic mean of precision and recall for `label`
    pub fn f1_score(&self, label: i32) -> f64 {
        let p = self.precision(label);
        let r = self.recall(label);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train the default solver on a libsvm file
    pub fn train_libsvm<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        LinearClassifier::new().train_from_file(path)
    }

    /// Train on one file, report accuracy on another
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
    ) -> Result<f64> {
        train_libsvm(train_path)?.evaluate_from_file(test_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn line_problem() -> Problem {
        let x = [2.0, -2.0, 1.5, -1.5, 1.8, -1.8]
            .iter()
            .map(|&v| SparseVector::from_pairs(&[(1, v)]))
            .collect();
        Problem::new(x, vec![1, -1, 1, -1, 1, -1]).unwrap()
    }

    #[test]
    fn test_builder_pattern() {
        let classifier = LinearClassifier::new()
            .with_c(2.0)
            .with_solver(SolverType::L2rLr)
            .with_max_iterations(50)
            .with_class_weight(1, 3.0);
        let param = classifier.parameter();
        assert_eq!(param.c, 2.0);
        assert_eq!(param.solver_type, SolverType::L2rLr);
        assert_eq!(param.eps, 0.01);
        assert_eq!(param.max_iterations(), 50);
        assert_eq!(param.class_weight(1), 3.0);

        // an explicit tolerance survives a later solver change
        let classifier = LinearClassifier::new()
            .with_eps(0.5)
            .with_solver(SolverType::L1rLr);
        assert_eq!(classifier.parameter().eps, 0.5);
    }

    #[test]
    fn test_quick_training() {
        let model = LinearClassifier::new()
            .train(&line_problem())
            .expect("Training should succeed");

        let prediction = model.predict(&SparseVector::from_pairs(&[(1, 1.0)]));
        assert_eq!(prediction.label, 1);
        assert_eq!(model.evaluate(&line_problem()), 1.0);
    }

    #[test]
    fn test_evaluation_metrics() {
        let metrics = EvaluationMetrics::from_predictions(&[1, 1, 1, 2, 2, 3], &[1, 1, 2, 2, 3, 3]);
        assert_eq!(metrics.total, 6);
        assert_eq!(metrics.count(1, 2), 1);
        assert_eq!(metrics.labels(), vec![1, 2, 3]);
        assert_eq!(metrics.accuracy(), 4.0 / 6.0);
        assert_eq!(metrics.precision(2), 0.5);
        assert_eq!(metrics.recall(1), 2.0 / 3.0);
        assert_eq!(metrics.recall(3), 1.0);
        assert_eq!(metrics.f1_score(7), 0.0);
    }

    #[test]
    fn test_file_operations() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:2.0").expect("Failed to write");
        writeln!(temp_file, "-1 1:-2.0").expect("Failed to write");
        writeln!(temp_file, "+1 1:1.5").expect("Failed to write");
        writeln!(temp_file, "-1 1:-1.5").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let model = LinearClassifier::new()
            .with_bias(1.0)
            .train_from_file(temp_file.path())
            .expect("Training should succeed");
        assert!(model.inner().has_bias());

        let accuracy = model
            .evaluate_from_file(temp_file.path())
            .expect("Evaluation should succeed");
        assert_eq!(accuracy, 1.0);

        let model_file = NamedTempFile::new().expect("Failed to create temp file");
        model.save(model_file.path()).expect("Save should succeed");
        let loaded = TrainedModel::load(model_file.path()).expect("Load should succeed");
        assert_eq!(loaded.inner().labels(), model.inner().labels());

        let split = quick::evaluate_split(temp_file.path(), temp_file.path())
            .expect("Quick evaluation should succeed");
        assert_eq!(split, 1.0);
    }

    #[test]
    fn test_cross_validate() {
        let result = LinearClassifier::new()
            .with_seed(5)
            .cross_validate(&line_problem(), 3)
            .expect("Cross-validation should succeed");
        assert_eq!(result.predictions.len(), 6);
        assert_eq!(result.metrics.total, 6);
        assert!((0.0..=1.0).contains(&result.accuracy()));
    }
}
