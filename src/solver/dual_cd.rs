//! Dual coordinate descent for L2-regularized linear classifiers
//!
//! One dual variable per instance is optimized at a time while the primal
//! weights `w = sum_i y_i alpha_i x_i` are kept up to date, so every update
//! costs O(nonzeros of the instance).
//!
//! - hinge loss: `0 <= alpha_i <= C_i`, no diagonal term
//! - squared hinge loss: `alpha_i >= 0`, diagonal term `1 / (2 C_i)`
//! - logistic loss: paired variables `alpha_i + alpha'_i = C_i`, each
//!   coordinate solved by a bounded Newton iteration on the entropy barrier

use super::shrinking::{ActiveSet, GradientWindow};
use super::{SolveResult, SolverSettings};
use crate::data::SparseMatrix;
use crate::utils::{dot, sparse_axpy, sparse_dot, ShuffleRng};

/// Newton steps allowed per logistic coordinate
const MAX_INNER_ITERATIONS: usize = 100;

/// Sweeps between forced reactivations of the full variable set
const MAX_REACTIVATION_INTERVAL: usize = 1000;

/// Loss handled by the dual solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualLoss {
    Hinge,
    SquaredHinge,
    Logistic,
}

/// Dual coordinate-descent solver for a binary split
#[derive(Debug, Clone)]
pub struct DualCoordinateDescent {
    loss: DualLoss,
    settings: SolverSettings,
}

impl DualCoordinateDescent {
    pub fn new(loss: DualLoss, settings: SolverSettings) -> Self {
        Self { loss, settings }
    }

    /// Solve for `y_i` in `{+1, -1}` and per-instance costs `cost`
    pub fn solve(
        &self,
        rows: &SparseMatrix,
        y: &[i8],
        cost: &[f64],
        rng: &mut ShuffleRng,
    ) -> SolveResult {
        match self.loss {
            DualLoss::Logistic => self.solve_logistic(rows, y, cost, rng),
            DualLoss::Hinge | DualLoss::SquaredHinge => self.solve_svc(rows, y, cost, rng),
        }
    }

    fn solve_svc(
        &self,
        rows: &SparseMatrix,
        y: &[i8],
        cost: &[f64],
        rng: &mut ShuffleRng,
    ) -> SolveResult {
        let l = rows.n_rows();
        let mut w = vec![0.0; rows.n_cols()];
        let mut alpha = vec![0.0; l];

        let (diag, upper): (Vec<f64>, Vec<f64>) = cost
            .iter()
            .map(|&c| match self.loss {
                DualLoss::SquaredHinge => (0.5 / c, f64::INFINITY),
                _ => (0.0, c),
            })
            .unzip();
        let qd: Vec<f64> = rows
            .row_norms_squared()
            .iter()
            .zip(&diag)
            .map(|(xtx, d)| xtx + d)
            .collect();

        let mut active = ActiveSet::new(l);
        let mut window = GradientWindow::unbounded();
        let reactivation_interval = l.clamp(1, MAX_REACTIVATION_INTERVAL);
        let mut tolerance = self.settings.eps;
        let mut iter = 0;
        let mut converged = false;

        while iter < self.settings.max_iterations {
            let mut pg_max = f64::NEG_INFINITY;
            let mut pg_min = f64::INFINITY;

            active.shuffle(rng);

            let mut s = 0;
            while s < active.len() {
                let i = active.get(s);
                let yi = f64::from(y[i]);
                let (cols, vals) = rows.row(i);

                let g = yi * sparse_dot(&w, cols, vals) - 1.0 + alpha[i] * diag[i];
                let c = upper[i];

                let mut pg = 0.0;
                if alpha[i] == 0.0 {
                    if g > window.max {
                        active.shrink(s);
                        continue;
                    } else if g < 0.0 {
                        pg = g;
                    }
                } else if alpha[i] == c {
                    if g < window.min {
                        active.shrink(s);
                        continue;
                    } else if g > 0.0 {
                        pg = g;
                    }
                } else {
                    pg = g;
                }

                pg_max = pg_max.max(pg);
                pg_min = pg_min.min(pg);

                if pg.abs() > 1.0e-12 {
                    let alpha_old = alpha[i];
                    alpha[i] = (alpha[i] - g / qd[i]).max(0.0).min(c);
                    sparse_axpy(&mut w, (alpha[i] - alpha_old) * yi, cols, vals);
                }
                s += 1;
            }

            iter += 1;
            let gap = if pg_max >= pg_min { pg_max - pg_min } else { 0.0 };
            if iter == 1 {
                tolerance = self.settings.eps * gap.min(1.0);
            }

            if gap <= tolerance {
                if active.is_full() {
                    converged = true;
                    break;
                }
                log::debug!("dual CD: shrunk set converged at iteration {iter}, reactivating");
                active.reactivate_all();
                window.reset();
                continue;
            }

            if iter % reactivation_interval == 0 && !active.is_full() {
                active.reactivate_all();
                window.reset();
                continue;
            }

            window.advance(pg_max, pg_min);
        }

        if !converged {
            log::warn!(
                "reaching max number of iterations ({})",
                self.settings.max_iterations
            );
        }

        let mut objective = dot(&w, &w);
        let mut n_sv = 0;
        for i in 0..l {
            objective += alpha[i] * (alpha[i] * diag[i] - 2.0);
            if alpha[i] > 0.0 {
                n_sv += 1;
            }
        }
        objective /= 2.0;
        log::info!("dual CD: {iter} iterations, objective {objective}, nSV {n_sv}");

        SolveResult {
            weights: w,
            iterations: iter,
            objective,
            converged,
        }
    }

    fn solve_logistic(
        &self,
        rows: &SparseMatrix,
        y: &[i8],
        cost: &[f64],
        rng: &mut ShuffleRng,
    ) -> SolveResult {
        let l = rows.n_rows();
        let mut w = vec![0.0; rows.n_cols()];
        let xtx = rows.row_norms_squared();

        // alpha[2i] pairs with alpha[2i + 1]; the two always sum to cost[i]
        let mut alpha = vec![0.0; 2 * l];
        for i in 0..l {
            alpha[2 * i] = (0.001 * cost[i]).min(1.0e-8);
            alpha[2 * i + 1] = cost[i] - alpha[2 * i];
            let (cols, vals) = rows.row(i);
            sparse_axpy(&mut w, f64::from(y[i]) * alpha[2 * i], cols, vals);
        }

        let mut order: Vec<usize> = (0..l).collect();
        let inner_eps_min = self.settings.eps.min(1.0e-8);
        let mut inner_eps = 1.0e-2;
        let mut tolerance = self.settings.eps;
        let mut iter = 0;
        let mut converged = false;

        while iter < self.settings.max_iterations {
            rng.shuffle_prefix(&mut order, l);
            let mut newton_steps = 0;
            let mut g_max = 0.0_f64;

            for &i in &order {
                let yi = f64::from(y[i]);
                let c = cost[i];
                let (cols, vals) = rows.row(i);
                let a = xtx[i];
                let b = yi * sparse_dot(&w, cols, vals);

                let (mut ind1, mut ind2, mut sign) = (2 * i, 2 * i + 1, 1.0);
                if 0.5 * a * (alpha[ind2] - alpha[ind1]) + b < 0.0 {
                    ind1 = 2 * i + 1;
                    ind2 = 2 * i;
                    sign = -1.0;
                }

                let alpha_old = alpha[ind1];
                let mut z = alpha_old;
                if c - z < 0.5 * c {
                    z *= 0.1;
                }
                let mut gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
                g_max = g_max.max(gp.abs());

                let mut inner = 0;
                while inner <= MAX_INNER_ITERATIONS {
                    if gp.abs() < inner_eps {
                        break;
                    }
                    let gpp = a + c / (c - z) / z;
                    let next = z - gp / gpp;
                    // stay strictly inside (0, c)
                    z = if next <= 0.0 { z * 0.1 } else { next };
                    gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
                    newton_steps += 1;
                    inner += 1;
                }

                if inner > 0 {
                    alpha[ind1] = z;
                    alpha[ind2] = c - z;
                    sparse_axpy(&mut w, sign * (z - alpha_old) * yi, cols, vals);
                }
            }

            iter += 1;
            if iter == 1 {
                tolerance = self.settings.eps * g_max.min(1.0);
            }
            if g_max < tolerance {
                converged = true;
                break;
            }
            if newton_steps <= l / 10 {
                inner_eps = inner_eps_min.max(0.1 * inner_eps);
            }
        }

        if !converged {
            log::warn!(
                "reaching max number of iterations ({})",
                self.settings.max_iterations
            );
        }

        let mut objective = 0.5 * dot(&w, &w);
        for i in 0..l {
            let c = cost[i];
            objective += alpha[2 * i] * alpha[2 * i].ln() + alpha[2 * i + 1] * alpha[2 * i + 1].ln()
                - c * c.ln();
        }
        log::info!("dual LR: {iter} iterations, objective {objective}");

        SolveResult {
            weights: w,
            iterations: iter,
            objective,
            converged,
        }
    }
}
