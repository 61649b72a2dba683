//! Optimization solvers for regularized linear classification
//!
//! Each solver family minimizes a regularized empirical risk for one class
//! split and returns dense weight columns:
//!
//! - [`dual_cd`]: dual coordinate descent for L2-regularized SVC and
//!   logistic regression
//! - [`tron`]: trust-region Newton for the smooth L2-regularized primal losses
//! - [`l1r_cd`]: per-feature coordinate descent for L1 regularization
//! - [`mcsvm_cs`]: joint Crammer-Singer multi-class dual
//!
//! The family is picked once per training run through [`Solver`], so the
//! inner loops never dispatch dynamically.

pub mod dual_cd;
pub mod l1r_cd;
pub mod mcsvm_cs;
pub mod objective;
pub mod shrinking;
pub mod tron;

pub use self::dual_cd::{DualCoordinateDescent, DualLoss};
pub use self::l1r_cd::{L1CoordinateDescent, L1Loss};
pub use self::mcsvm_cs::CrammerSinger;
pub use self::objective::{LogisticLoss, ObjectiveFunction, SquaredHingeLoss};
pub use self::shrinking::{ActiveSet, GradientWindow};
pub use self::tron::TrustRegionNewton;

use crate::core::{LinearError, Problem, Result, SolverType};
use crate::data::SparseMatrix;
use crate::utils::ShuffleRng;

/// Sparse data shared by every sub-problem of one training run
#[derive(Debug, Clone)]
pub struct TrainingData {
    rows: SparseMatrix,
    columns: Option<SparseMatrix>,
}

impl TrainingData {
    /// Pack a validated problem; `with_columns` also builds the transpose
    pub fn new(problem: &Problem, with_columns: bool) -> Self {
        let rows = SparseMatrix::from_problem(problem);
        let columns = with_columns.then(|| rows.transpose());
        Self { rows, columns }
    }

    /// Instance-major storage
    pub fn rows(&self) -> &SparseMatrix {
        &self.rows
    }

    /// Feature-major storage, built on first need
    pub fn columns(&mut self) -> &SparseMatrix {
        let rows = &self.rows;
        self.columns.get_or_insert_with(|| rows.transpose())
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.rows.n_rows()
    }

    /// Whether there are no instances
    pub fn is_empty(&self) -> bool {
        self.rows.n_rows() == 0
    }

    /// Number of weights per class column (bias included)
    pub fn n_features(&self) -> usize {
        self.rows.n_cols()
    }
}

/// How the instances are split into classes for one solve
#[derive(Debug, Clone, Copy)]
pub enum ClassSplit<'a> {
    /// Binary sub-problem: `+1`/`-1` per instance and the instance's cost
    Binary { y: &'a [i8], cost: &'a [f64] },
    /// Joint multi-class problem: class position per instance and its cost
    MultiClass {
        class_of: &'a [usize],
        nr_class: usize,
        cost: &'a [f64],
    },
}

/// Stopping rule shared by all solvers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub eps: f64,
    pub max_iterations: usize,
}

/// Weights and diagnostics produced by one solve
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Dense weights; multi-class results are feature-major
    /// (`weights[feature * nr_class + class]`)
    pub weights: Vec<f64>,
    /// Outer iterations performed
    pub iterations: usize,
    /// Final objective value (primal or dual, depending on the solver)
    pub objective: f64,
    /// Whether the stopping tolerance was met before the iteration cap
    pub converged: bool,
}

/// Solver family selected from a [`SolverType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    DualCoordinateDescent(DualLoss),
    TrustRegion(PrimalLoss),
    L1CoordinateDescent(L1Loss),
    CrammerSinger,
}

/// Smooth primal losses minimized by the trust-region solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimalLoss {
    Logistic,
    SquaredHinge,
}

impl Solver {
    /// Family implementing `solver_type`
    pub fn for_type(solver_type: SolverType) -> Self {
        match solver_type {
            SolverType::L2rLr => Solver::TrustRegion(PrimalLoss::Logistic),
            SolverType::L2rL2LossSvc => Solver::TrustRegion(PrimalLoss::SquaredHinge),
            SolverType::L2rL2LossSvcDual => Solver::DualCoordinateDescent(DualLoss::SquaredHinge),
            SolverType::L2rL1LossSvcDual => Solver::DualCoordinateDescent(DualLoss::Hinge),
            SolverType::L2rLrDual => Solver::DualCoordinateDescent(DualLoss::Logistic),
            SolverType::L1rL2LossSvc => Solver::L1CoordinateDescent(L1Loss::SquaredHinge),
            SolverType::L1rLr => Solver::L1CoordinateDescent(L1Loss::Logistic),
            SolverType::McsvmCs => Solver::CrammerSinger,
        }
    }

    /// Whether the solver sweeps over features and needs the transpose
    pub fn needs_columns(self) -> bool {
        matches!(self, Solver::L1CoordinateDescent(_))
    }

    /// Whether the solver expects a [`ClassSplit::MultiClass`] split
    pub fn is_multiclass(self) -> bool {
        self == Solver::CrammerSinger
    }

    /// Solve one class split
    ///
    /// A multi-class split given to a binary solver, or the other way
    /// around, is an `InvalidParameter` error.
    pub fn solve(
        self,
        data: &mut TrainingData,
        split: ClassSplit<'_>,
        settings: SolverSettings,
        rng: &mut ShuffleRng,
    ) -> Result<SolveResult> {
        let result = match (self, split) {
            (Solver::CrammerSinger, ClassSplit::MultiClass { class_of, nr_class, cost }) => {
                CrammerSinger::new(settings).solve(data.rows(), class_of, nr_class, cost, rng)
            }
            (Solver::DualCoordinateDescent(loss), ClassSplit::Binary { y, cost }) => {
                DualCoordinateDescent::new(loss, settings).solve(data.rows(), y, cost, rng)
            }
            (Solver::TrustRegion(loss), ClassSplit::Binary { y, cost }) => {
                let settings = SolverSettings {
                    eps: primal_tolerance(settings.eps, y),
                    ..settings
                };
                let tron = TrustRegionNewton::new(settings);
                let rows = data.rows();
                match loss {
                    PrimalLoss::Logistic => tron.minimize(&mut LogisticLoss::new(rows, y, cost)),
                    PrimalLoss::SquaredHinge => {
                        tron.minimize(&mut SquaredHingeLoss::new(rows, y, cost))
                    }
                }
            }
            (Solver::L1CoordinateDescent(loss), ClassSplit::Binary { y, cost }) => {
                L1CoordinateDescent::new(loss, settings).solve(data.columns(), y, cost, rng)
            }
            (solver, _) => {
                return Err(LinearError::InvalidParameter(format!(
                    "class split does not match solver {solver:?}"
                )))
            }
        };
        Ok(result)
    }
}

/// Scale the primal tolerance by the share of the minority side
fn primal_tolerance(eps: f64, y: &[i8]) -> f64 {
    let positives = y.iter().filter(|&&v| v > 0).count();
    let negatives = y.len() - positives;
    let minority = positives.min(negatives).max(1);
    eps * minority as f64 / y.len().max(1) as f64
}
