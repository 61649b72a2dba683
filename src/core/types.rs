//! Core type definitions: sparse instances, labeled problems and predictions

use crate::core::{LinearError, Result};

/// Prediction result containing the label and the raw per-column scores
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class label
    pub label: i32,
    /// One decision value per stored weight column
    pub decision_values: Vec<f64>,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: i32, decision_values: Vec<f64>) -> Self {
        Self {
            label,
            decision_values,
        }
    }

    /// Largest absolute decision value, a rough confidence measure
    pub fn confidence(&self) -> f64 {
        self.decision_values
            .iter()
            .fold(0.0_f64, |acc, &v| acc.max(v.abs()))
    }
}

/// Sparse vector with 1-based feature indices
///
/// Indices are expected to be strictly ascending. Construction keeps the
/// order it is given so that ordering violations can be reported by
/// [`Problem::validate`] instead of being silently repaired.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SparseVector {
    /// Feature indices (1-based)
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector from parallel index and value lists
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );
        Self { indices, values }
    }

    /// Create a sparse vector from `(index, value)` pairs
    pub fn from_pairs(pairs: &[(usize, f64)]) -> Self {
        let (indices, values) = pairs.iter().copied().unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self::default()
    }

    /// Iterate over `(index, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Largest feature index, 0 for an empty vector
    pub fn max_index(&self) -> usize {
        self.indices.iter().copied().max().unwrap_or(0)
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the first pair `(previous, index)` breaking strict ascending order
    pub fn first_unsorted(&self) -> Option<(usize, usize)> {
        self.indices
            .windows(2)
            .find(|pair| pair[1] <= pair[0])
            .map(|pair| (pair[0], pair[1]))
    }
}

/// Labeled, weighted training problem
///
/// `n` is the feature dimensionality without the bias feature. When `bias`
/// is non-negative every instance is treated as if it carried an extra
/// feature `n + 1` with value `bias`.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Sparse instances, one per example
    pub x: Vec<SparseVector>,
    /// Integer class label per instance
    pub y: Vec<i32>,
    /// Per-instance weight, multiplies the cost of the instance
    pub weights: Vec<f64>,
    /// Feature dimensionality (excluding the bias feature)
    pub n: usize,
    /// Bias value; negative disables the bias feature
    pub bias: f64,
}

impl Problem {
    /// Create a problem with unit weights and no bias
    ///
    /// The dimensionality is the largest feature index over all instances.
    pub fn new(x: Vec<SparseVector>, y: Vec<i32>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(LinearError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        let n = x.iter().map(SparseVector::max_index).max().unwrap_or(0);
        let weights = vec![1.0; x.len()];
        Ok(Self {
            x,
            y,
            weights,
            n,
            bias: -1.0,
        })
    }

    /// Replace the per-instance weights
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.x.len() {
            return Err(LinearError::DimensionMismatch {
                expected: self.x.len(),
                actual: weights.len(),
            });
        }
        self.weights = weights;
        Ok(self)
    }

    /// Set the bias value (negative disables the bias feature)
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Declare an explicit dimensionality
    pub fn with_dimension(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Check if the problem has no instances
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Whether the bias feature is enabled
    pub fn has_bias(&self) -> bool {
        self.bias >= 0.0
    }

    /// Dimensionality seen by the solvers (bias feature included)
    pub fn feature_dim(&self) -> usize {
        if self.has_bias() {
            self.n + 1
        } else {
            self.n
        }
    }

    /// Check array lengths, index ordering and weights
    pub fn validate(&self) -> Result<()> {
        let l = self.x.len();
        if self.y.len() != l {
            return Err(LinearError::DimensionMismatch {
                expected: l,
                actual: self.y.len(),
            });
        }
        if self.weights.len() != l {
            return Err(LinearError::DimensionMismatch {
                expected: l,
                actual: self.weights.len(),
            });
        }
        if !self.bias.is_finite() {
            return Err(LinearError::InvalidProblem(format!(
                "bias must be finite, got {}",
                self.bias
            )));
        }

        for (i, instance) in self.x.iter().enumerate() {
            if instance.indices.len() != instance.values.len() {
                return Err(LinearError::DimensionMismatch {
                    expected: instance.indices.len(),
                    actual: instance.values.len(),
                });
            }
            if let Some((previous, index)) = instance.first_unsorted() {
                return Err(LinearError::UnsortedFeatures {
                    instance: i,
                    previous,
                    index,
                });
            }
            if let (Some(&first), Some(&last)) = (instance.indices.first(), instance.indices.last())
            {
                let bad = if first == 0 {
                    Some(first)
                } else if last > self.n {
                    Some(last)
                } else {
                    None
                };
                if let Some(index) = bad {
                    return Err(LinearError::FeatureIndexOutOfRange {
                        instance: i,
                        index,
                        max: self.n,
                    });
                }
            }
        }

        for (i, &weight) in self.weights.iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(LinearError::InvalidProblem(format!(
                    "weight of instance {i} must be a non-negative finite number, got {weight}"
                )));
            }
        }

        Ok(())
    }

    /// Copy of the problem restricted to `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Problem {
        Problem {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            weights: indices.iter().map(|&i| self.weights[i]).collect(),
            n: self.n,
            bias: self.bias,
        }
    }

    /// Copy of the problem without the instances whose weight is zero
    pub fn remove_zero_weight(&self) -> Problem {
        let kept: Vec<usize> = (0..self.len())
            .filter(|&i| self.weights[i] != 0.0)
            .collect();
        self.subset(&kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(pairs: &[(usize, f64)]) -> SparseVector {
        SparseVector::from_pairs(pairs)
    }

    #[test]
    fn test_sparse_vector_keeps_given_order() {
        let v = SparseVector::new(vec![3, 1], vec![2.0, 1.0]);
        assert_eq!(v.indices, vec![3, 1]);
        assert_eq!(v.first_unsorted(), Some((3, 1)));
    }

    #[test]
    fn test_sparse_vector_get() {
        let v = sv(&[(1, 1.0), (3, 2.0), (5, 3.0)]);

        assert_eq!(v.get(0), 0.0);
        assert_eq!(v.get(1), 1.0);
        assert_eq!(v.get(3), 2.0);
        assert_eq!(v.get(5), 3.0);
        assert_eq!(v.get(6), 0.0);
        assert_eq!(v.max_index(), 5);
    }

    #[test]
    fn test_sparse_vector_norm() {
        let v = sv(&[(1, 3.0), (2, 4.0)]);
        assert_eq!(v.norm_squared(), 25.0);
        assert_eq!(v.nnz(), 2);
        assert!(SparseVector::empty().is_empty());
    }

    #[test]
    #[should_panic(expected = "Indices and values must have same length")]
    fn test_sparse_vector_length_mismatch() {
        SparseVector::new(vec![1, 2], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_problem_dimension_and_bias() {
        let problem = Problem::new(vec![sv(&[(1, 1.0), (4, 1.0)]), sv(&[(2, 1.0)])], vec![0, 1])
            .unwrap();
        assert_eq!(problem.n, 4);
        assert_eq!(problem.feature_dim(), 4);
        assert_eq!(problem.weights, vec![1.0, 1.0]);

        let problem = problem.with_bias(1.0);
        assert!(problem.has_bias());
        assert_eq!(problem.feature_dim(), 5);
    }

    #[test]
    fn test_problem_label_count_mismatch() {
        let result = Problem::new(vec![sv(&[(1, 1.0)])], vec![0, 1]);
        assert!(matches!(
            result,
            Err(LinearError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_validate_rejects_descending_indices() {
        let problem = Problem::new(vec![sv(&[(2, 1.0), (1, 1.0)])], vec![0]).unwrap();
        let err = problem.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("feature nodes"));
        assert!(message.contains("sorted"));
        assert!(message.contains("ascending order"));
        assert!(message.contains("index 1 follows index 2"));
    }

    #[test]
    fn test_validate_rejects_duplicate_and_out_of_range() {
        let duplicate = Problem::new(vec![sv(&[(2, 1.0), (2, 1.0)])], vec![0]).unwrap();
        assert!(matches!(
            duplicate.validate(),
            Err(LinearError::UnsortedFeatures { .. })
        ));

        let zero_index = Problem::new(vec![sv(&[(0, 1.0)])], vec![0]).unwrap();
        assert!(matches!(
            zero_index.validate(),
            Err(LinearError::FeatureIndexOutOfRange { index: 0, .. })
        ));

        let too_large = Problem::new(vec![sv(&[(3, 1.0)])], vec![0])
            .unwrap()
            .with_dimension(2);
        assert!(matches!(
            too_large.validate(),
            Err(LinearError::FeatureIndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_ragged_instance() {
        let mut problem = Problem::new(vec![sv(&[(1, 1.0), (2, 2.0)])], vec![0]).unwrap();
        problem.x[0].values.pop();
        assert!(matches!(
            problem.validate(),
            Err(LinearError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let problem = Problem::new(vec![sv(&[(1, 1.0)])], vec![0])
            .unwrap()
            .with_weights(vec![-1.0])
            .unwrap();
        assert!(matches!(
            problem.validate(),
            Err(LinearError::InvalidProblem(_))
        ));
    }

    #[test]
    fn test_remove_zero_weight() {
        let problem = Problem::new(
            vec![sv(&[(1, 1.0), (2, 1.0)]), sv(&[(3, 1.0)]), sv(&[(3, 1.0)])],
            vec![0, 1, 1],
        )
        .unwrap()
        .with_weights(vec![0.0, 1.0, 1.0])
        .unwrap();

        let pruned = problem.remove_zero_weight();
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned.x[0], problem.x[1]);
        assert_eq!(pruned.x[1], problem.x[2]);
        assert_eq!(pruned.y, vec![1, 1]);
        assert_eq!(pruned.weights, vec![1.0, 1.0]);
        assert_eq!(pruned.n, problem.n);
    }

    #[test]
    fn test_prediction_confidence() {
        let prediction = Prediction::new(3, vec![-0.5, 1.5, -2.0]);
        assert_eq!(prediction.label, 3);
        assert_eq!(prediction.confidence(), 2.0);
    }
}
