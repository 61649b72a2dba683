//! k-fold cross-validation

use super::Trainer;
use crate::core::{LinearError, Parameter, Predictor, Problem, Result};

impl Trainer {
    /// Fill `target` with held-out predictions from `nr_fold`-fold
    /// cross-validation
    ///
    /// Instances are permuted with the trainer's random source and cut into
    /// `nr_fold` contiguous blocks of the permuted order. Each block is
    /// predicted by a model trained on the other blocks; `target[i]` receives
    /// the prediction for instance `i`.
    pub fn cross_validation_into(
        &mut self,
        problem: &Problem,
        param: &Parameter,
        nr_fold: usize,
        target: &mut [i32],
    ) -> Result<()> {
        param.validate()?;
        problem.validate()?;

        let l = problem.len();
        if nr_fold < 2 || nr_fold > l {
            return Err(LinearError::InvalidParameter(format!(
                "number of folds must be between 2 and the number of instances ({l}), got {nr_fold}"
            )));
        }
        if target.len() != l {
            return Err(LinearError::DimensionMismatch {
                expected: l,
                actual: target.len(),
            });
        }

        let mut perm: Vec<usize> = (0..l).collect();
        self.rng_mut().shuffle_prefix(&mut perm, l);
        let fold_start: Vec<usize> = (0..=nr_fold).map(|i| i * l / nr_fold).collect();

        for fold in 0..nr_fold {
            let (begin, end) = (fold_start[fold], fold_start[fold + 1]);
            let train_indices: Vec<usize> = perm[..begin]
                .iter()
                .chain(&perm[end..])
                .copied()
                .collect();

            let sub_problem = problem.subset(&train_indices);
            let model = self.train(&sub_problem, param)?;
            for &i in &perm[begin..end] {
                target[i] = model.predict_label(&problem.x[i]);
            }
            log::debug!("fold {}/{} done", fold + 1, nr_fold);
        }
        Ok(())
    }

    /// Held-out predictions from `nr_fold`-fold cross-validation
    pub fn cross_validation(
        &mut self,
        problem: &Problem,
        param: &Parameter,
        nr_fold: usize,
    ) -> Result<Vec<i32>> {
        let mut target = vec![0; problem.len()];
        self.cross_validation_into(problem, param, nr_fold, &mut target)?;
        Ok(target)
    }
}

/// Cross-validate with a default-seeded [`Trainer`]
pub fn cross_validation(problem: &Problem, param: &Parameter, nr_fold: usize) -> Result<Vec<i32>> {
    Trainer::new().cross_validation(problem, param, nr_fold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SolverType, SparseVector};

    fn problem() -> Problem {
        let x: Vec<SparseVector> = (0..12)
            .map(|i| {
                let v = 1.0 + (i / 2) as f64 * 0.1;
                if i % 2 == 0 {
                    SparseVector::from_pairs(&[(1, v)])
                } else {
                    SparseVector::from_pairs(&[(2, v)])
                }
            })
            .collect();
        let y = (0..12).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect();
        Problem::new(x, y).unwrap().with_bias(1.0)
    }

    #[test]
    fn test_predictions_are_known_labels() {
        let problem = problem();
        for solver in SolverType::ALL {
            let target = cross_validation(&problem, &Parameter::with_solver(solver), 3).unwrap();
            assert_eq!(target.len(), problem.len());
            assert!(target.iter().all(|t| *t == 1 || *t == 2));
        }
    }

    #[test]
    fn test_separable_data_is_predicted_exactly() {
        let problem = problem();
        let param = Parameter::new(SolverType::L2rL2LossSvcDual, 10.0, 0.01);
        let target = cross_validation(&problem, &param, 4).unwrap();
        assert_eq!(target, problem.y);
    }

    #[test]
    fn test_leave_one_out() {
        let problem = problem();
        let target = Trainer::with_seed(3)
            .cross_validation(&problem, &Parameter::default(), problem.len())
            .unwrap();
        assert_eq!(target.len(), problem.len());
    }

    #[test]
    fn test_fold_count_out_of_range() {
        let problem = problem();
        let param = Parameter::default();
        for nr_fold in [0, 1, problem.len() + 1] {
            assert!(matches!(
                cross_validation(&problem, &param, nr_fold),
                Err(LinearError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_target_length_checked() {
        let problem = problem();
        let mut target = vec![0; 3];
        let result =
            Trainer::new().cross_validation_into(&problem, &Parameter::default(), 2, &mut target);
        assert!(matches!(result, Err(LinearError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let problem = problem();
        let param = Parameter::with_solver(SolverType::L2rLr);
        let a = Trainer::with_seed(9).cross_validation(&problem, &param, 5).unwrap();
        let b = Trainer::with_seed(9).cross_validation(&problem, &param, 5).unwrap();
        assert_eq!(a, b);
    }
}
