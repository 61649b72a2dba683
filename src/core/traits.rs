//! Core traits for linear models

use crate::core::{Prediction, Problem, SparseVector};

/// Trained classifier that scores sparse instances
pub trait Predictor {
    /// Raw decision values, one per stored weight column
    fn decision_values(&self, x: &SparseVector) -> Vec<f64>;

    /// Predicted class label
    fn predict_label(&self, x: &SparseVector) -> i32;

    /// Label together with its decision values
    fn predict(&self, x: &SparseVector) -> Prediction {
        Prediction::new(self.predict_label(x), self.decision_values(x))
    }

    /// Predict multiple instances
    fn predict_batch(&self, xs: &[SparseVector]) -> Vec<i32> {
        xs.iter().map(|x| self.predict_label(x)).collect()
    }

    /// Fraction of instances of `problem` whose label is predicted correctly
    fn accuracy(&self, problem: &Problem) -> f64 {
        if problem.is_empty() {
            return 0.0;
        }
        let correct = problem
            .x
            .iter()
            .zip(problem.y.iter())
            .filter(|(x, &y)| self.predict_label(x) == y)
            .count();
        correct as f64 / problem.len() as f64
    }
}
