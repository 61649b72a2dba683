//! Training orchestration
//!
//! [`Trainer`] validates the input, groups instances by label, derives the
//! per-instance costs and runs the solver family picked by the
//! configuration: one joint multi-class solve, one binary solve, or one
//! one-vs-rest solve per class.

pub mod cross_validation;

use crate::core::{LinearError, Parameter, Problem, Result};
use crate::model::Model;
use crate::solver::{ClassSplit, Solver, SolverSettings, TrainingData};
use crate::utils::ShuffleRng;
use std::borrow::Cow;
use std::collections::HashMap;

/// Distinct labels in first-seen order and the class position of every instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGroups {
    pub labels: Vec<i32>,
    pub counts: Vec<usize>,
    pub class_of: Vec<usize>,
}

impl ClassGroups {
    pub fn from_labels(y: &[i32]) -> Self {
        let mut position: HashMap<i32, usize> = HashMap::new();
        let mut labels = Vec::new();
        let mut counts = Vec::new();
        let class_of = y
            .iter()
            .map(|&label| {
                let k = *position.entry(label).or_insert_with(|| {
                    labels.push(label);
                    counts.push(0);
                    labels.len() - 1
                });
                counts[k] += 1;
                k
            })
            .collect();
        Self {
            labels,
            counts,
            class_of,
        }
    }

    pub fn nr_class(&self) -> usize {
        self.labels.len()
    }
}

/// Owns the random source used for sweep orders and fold assignment
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    rng: ShuffleRng,
}

impl Trainer {
    /// Trainer seeded with the default seed
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ShuffleRng::new(seed),
        }
    }

    /// Restart the random sequence from `seed`
    pub fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    /// Restart the random sequence from the current seed
    pub fn reset(&mut self) {
        self.rng.reset();
    }

    pub fn rng_mut(&mut self) -> &mut ShuffleRng {
        &mut self.rng
    }

    /// Train a model on `problem` with configuration `param`
    pub fn train(&mut self, problem: &Problem, param: &Parameter) -> Result<Model> {
        param.validate()?;
        problem.validate()?;

        let problem: Cow<'_, Problem> = if problem.weights.iter().any(|&w| w == 0.0) {
            let kept = problem.remove_zero_weight();
            log::debug!(
                "dropped {} instances with zero weight",
                problem.len() - kept.len()
            );
            Cow::Owned(kept)
        } else {
            Cow::Borrowed(problem)
        };
        if problem.is_empty() {
            return Err(LinearError::EmptyDataset);
        }

        let groups = ClassGroups::from_labels(&problem.y);
        for &(label, _) in &param.weights {
            if !groups.labels.contains(&label) {
                log::warn!("class label {label} specified in weight is not found");
            }
        }
        let weighted_c: Vec<f64> = groups
            .labels
            .iter()
            .map(|&label| param.c * param.class_weight(label))
            .collect();

        let solver = Solver::for_type(param.solver_type);
        let settings = SolverSettings {
            eps: param.eps,
            max_iterations: param.max_iterations(),
        };
        let mut data = TrainingData::new(&problem, solver.needs_columns());
        let nr_class = groups.nr_class();
        let l = problem.len();

        log::info!(
            "training {} on {} instances, {} features, {} classes",
            param.solver_type,
            l,
            problem.n,
            nr_class
        );

        let w = if solver.is_multiclass() {
            let cost: Vec<f64> = (0..l)
                .map(|i| problem.weights[i] * weighted_c[groups.class_of[i]])
                .collect();
            let split = ClassSplit::MultiClass {
                class_of: &groups.class_of,
                nr_class,
                cost: &cost,
            };
            solver.solve(&mut data, split, settings, &mut self.rng)?.weights
        } else if nr_class == 2 {
            let y: Vec<i8> = groups
                .class_of
                .iter()
                .map(|&k| if k == 0 { 1 } else { -1 })
                .collect();
            let cost: Vec<f64> = (0..l)
                .map(|i| problem.weights[i] * weighted_c[groups.class_of[i]])
                .collect();
            let split = ClassSplit::Binary { y: &y, cost: &cost };
            solver.solve(&mut data, split, settings, &mut self.rng)?.weights
        } else {
            self.one_vs_rest(&mut data, &problem, &groups, &weighted_c, param.c, solver, settings)?
        };

        let bias = if problem.has_bias() { problem.bias } else { -1.0 };
        Model::from_parts(param.solver_type, groups.labels, problem.n, bias, w)
    }

    /// One binary solve per class, columns interleaved feature-major
    #[allow(clippy::too_many_arguments)]
    fn one_vs_rest(
        &mut self,
        data: &mut TrainingData,
        problem: &Problem,
        groups: &ClassGroups,
        weighted_c: &[f64],
        c: f64,
        solver: Solver,
        settings: SolverSettings,
    ) -> Result<Vec<f64>> {
        let nr_class = groups.nr_class();
        let n_cols = data.n_features();
        let l = problem.len();
        let mut w = vec![0.0; n_cols * nr_class];
        let mut y = vec![0i8; l];
        let mut cost = vec![0.0; l];

        for k in 0..nr_class {
            for i in 0..l {
                if groups.class_of[i] == k {
                    y[i] = 1;
                    cost[i] = problem.weights[i] * weighted_c[k];
                } else {
                    y[i] = -1;
                    cost[i] = problem.weights[i] * c;
                }
            }
            log::debug!("one-vs-rest: class {} against the rest", groups.labels[k]);

            let split = ClassSplit::Binary { y: &y, cost: &cost };
            let result = solver.solve(data, split, settings, &mut self.rng)?;
            for (j, &wj) in result.weights.iter().enumerate() {
                w[j * nr_class + k] = wj;
            }
        }
        Ok(w)
    }
}

/// Train with a default-seeded [`Trainer`]
pub fn train(problem: &Problem, param: &Parameter) -> Result<Model> {
    Trainer::new().train(problem, param)
}
