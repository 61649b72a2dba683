//! Coordinate descent for L1-regularized linear classifiers
//!
//! Sweeps over features instead of instances. Each coordinate takes a
//! soft-thresholded Newton step on the smooth loss, clipped to a
//! per-coordinate trust interval and refined by an Armijo backtracking
//! search. Zero coordinates with a small sub-gradient are shrunk.

use super::shrinking::ActiveSet;
use super::{SolveResult, SolverSettings};
use crate::data::SparseMatrix;
use crate::utils::ShuffleRng;

const MAX_LINE_SEARCH: usize = 20;
const SIGMA: f64 = 0.01;
const MIN_CURVATURE: f64 = 1.0e-12;
const MAX_REACTIVATION_INTERVAL: usize = 1000;

const INITIAL_RADIUS: f64 = 10.0;
const MAX_RADIUS: f64 = 1.0e3;
const MIN_RADIUS: f64 = 1.0e-4;

/// Smooth loss paired with the L1 regularizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L1Loss {
    SquaredHinge,
    Logistic,
}

/// Feature-wise coordinate-descent solver for a binary split
#[derive(Debug, Clone)]
pub struct L1CoordinateDescent {
    loss: L1Loss,
    settings: SolverSettings,
}

/// Per-coordinate bound on the step length
#[derive(Debug, Clone)]
struct TrustInterval {
    radius: Vec<f64>,
}

impl TrustInterval {
    fn new(n: usize) -> Self {
        Self {
            radius: vec![INITIAL_RADIUS; n],
        }
    }

    fn clip(&self, j: usize, d: f64) -> f64 {
        d.clamp(-self.radius[j], self.radius[j])
    }

    /// Grow after a full step was accepted, otherwise shrink to the step taken
    fn update(&mut self, j: usize, d: f64, full_step: bool) {
        self.radius[j] = if full_step {
            (2.0 * self.radius[j]).min(MAX_RADIUS)
        } else {
            d.abs().max(MIN_RADIUS)
        };
    }
}

/// Sub-gradient violation of coordinate `w` given `G + 1` and `G - 1`
///
/// Returns `None` when the coordinate is zero and well inside the
/// shrinking threshold.
fn violation(w: f64, gp: f64, gn: f64, threshold: f64) -> Option<f64> {
    if w == 0.0 {
        if gp < 0.0 {
            Some(-gp)
        } else if gn > 0.0 {
            Some(gn)
        } else if gp > threshold && gn < -threshold {
            None
        } else {
            Some(0.0)
        }
    } else if w > 0.0 {
        Some(gp.abs())
    } else {
        Some(gn.abs())
    }
}

/// Newton step of the one-dimensional L1-penalized quadratic model
fn newton_direction(w: f64, gp: f64, gn: f64, h: f64) -> f64 {
    if gp <= h * w {
        -gp / h
    } else if gn >= h * w {
        -gn / h
    } else {
        -w
    }
}

/// Loop state shared by both losses
struct Sweep {
    active: ActiveSet,
    radius: TrustInterval,
    gmax_old: f64,
    gmax_init: f64,
    iter: usize,
    reactivation_interval: usize,
}

impl Sweep {
    fn new(w_size: usize) -> Self {
        Self {
            active: ActiveSet::new(w_size),
            radius: TrustInterval::new(w_size),
            gmax_old: f64::INFINITY,
            gmax_init: 0.0,
            iter: 0,
            reactivation_interval: w_size.clamp(1, MAX_REACTIVATION_INTERVAL),
        }
    }

    /// Record a finished sweep; returns `true` once converged
    fn finish(&mut self, gmax_new: f64, eps: f64) -> bool {
        if self.iter == 0 {
            self.gmax_init = gmax_new;
        }
        self.iter += 1;

        if gmax_new <= eps * self.gmax_init {
            if self.active.is_full() {
                return true;
            }
            log::debug!("L1 CD: shrunk set converged at iteration {}, reactivating", self.iter);
            self.reactivate();
            return false;
        }

        if self.iter % self.reactivation_interval == 0 && !self.active.is_full() {
            self.reactivate();
            return false;
        }

        self.gmax_old = gmax_new;
        false
    }

    fn reactivate(&mut self) {
        self.active.reactivate_all();
        self.gmax_old = f64::INFINITY;
    }
}

impl L1CoordinateDescent {
    pub fn new(loss: L1Loss, settings: SolverSettings) -> Self {
        Self { loss, settings }
    }

    /// Solve on feature-major `columns` (row `j` lists the instances that
    /// have feature `j`) for labels `y` and per-instance costs `cost`
    pub fn solve(
        &self,
        columns: &SparseMatrix,
        y: &[i8],
        cost: &[f64],
        rng: &mut ShuffleRng,
    ) -> SolveResult {
        let result = match self.loss {
            L1Loss::SquaredHinge => self.solve_squared_hinge(columns, y, cost, rng),
            L1Loss::Logistic => self.solve_logistic(columns, y, cost, rng),
        };
        if !result.converged {
            log::warn!(
                "reaching max number of iterations ({})",
                self.settings.max_iterations
            );
        }
        let nnz = result.weights.iter().filter(|&&w| w != 0.0).count();
        log::info!(
            "L1 CD: {} iterations, objective {}, #nonzeros/#features = {}/{}",
            result.iterations,
            result.objective,
            nnz,
            result.weights.len()
        );
        result
    }

    fn solve_squared_hinge(
        &self,
        columns: &SparseMatrix,
        y: &[i8],
        cost: &[f64],
        rng: &mut ShuffleRng,
    ) -> SolveResult {
        let w_size = columns.n_rows();
        let l = columns.n_cols();
        let mut w = vec![0.0; w_size];
        // b[i] = 1 - y_i w'x_i
        let mut b = vec![1.0; l];

        let xj_sq: Vec<f64> = (0..w_size)
            .map(|j| {
                let (inst, vals) = columns.row(j);
                inst.iter().zip(vals).map(|(&i, &x)| cost[i] * x * x).sum()
            })
            .collect();

        let mut sweep = Sweep::new(w_size);
        let mut converged = false;

        while sweep.iter < self.settings.max_iterations {
            let mut gmax_new = 0.0_f64;
            sweep.active.shuffle(rng);

            let mut s = 0;
            while s < sweep.active.len() {
                let j = sweep.active.get(s);
                let (inst, vals) = columns.row(j);

                let mut g_loss = 0.0;
                let mut h = 0.0;
                for (&i, &x) in inst.iter().zip(vals) {
                    if b[i] > 0.0 {
                        let val = f64::from(y[i]) * x;
                        let tmp = cost[i] * val;
                        g_loss -= tmp * b[i];
                        h += tmp * val;
                    }
                }
                g_loss *= 2.0;
                let g = g_loss;
                let h = (2.0 * h).max(MIN_CURVATURE);
                let gp = g + 1.0;
                let gn = g - 1.0;

                let Some(v) = violation(w[j], gp, gn, sweep.gmax_old / l as f64) else {
                    sweep.active.shrink(s);
                    continue;
                };
                gmax_new = gmax_new.max(v);
                s += 1;

                let d = newton_direction(w[j], gp, gn, h);
                if d.abs() < 1.0e-12 {
                    continue;
                }
                let mut d = sweep.radius.clip(j, d);
                let mut delta = (w[j] + d).abs() - w[j].abs() + g * d;

                let mut d_old = 0.0;
                let mut loss_old = 0.0;
                let mut steps = 0;
                let mut accepted = false;
                while steps < MAX_LINE_SEARCH {
                    let d_diff = d_old - d;
                    let mut cond = (w[j] + d).abs() - w[j].abs() - SIGMA * delta;

                    let appxcond = xj_sq[j] * d * d + g_loss * d + cond;
                    if appxcond <= 0.0 {
                        for (&i, &x) in inst.iter().zip(vals) {
                            b[i] += d_diff * f64::from(y[i]) * x;
                        }
                        accepted = true;
                        break;
                    }

                    let mut loss_new = 0.0;
                    for (&i, &x) in inst.iter().zip(vals) {
                        if steps == 0 && b[i] > 0.0 {
                            loss_old += cost[i] * b[i] * b[i];
                        }
                        b[i] += d_diff * f64::from(y[i]) * x;
                        if b[i] > 0.0 {
                            loss_new += cost[i] * b[i] * b[i];
                        }
                    }

                    cond += loss_new - loss_old;
                    if cond <= 0.0 {
                        accepted = true;
                        break;
                    }
                    d_old = d;
                    d *= 0.5;
                    delta *= 0.5;
                    steps += 1;
                }

                w[j] += d;
                sweep.radius.update(j, d, accepted && steps == 0);

                if !accepted {
                    log::debug!("L1 CD: line search exhausted on feature {j}");
                    b.iter_mut().for_each(|bi| *bi = 1.0);
                    for (k, &wk) in w.iter().enumerate() {
                        if wk == 0.0 {
                            continue;
                        }
                        let (inst, vals) = columns.row(k);
                        for (&i, &x) in inst.iter().zip(vals) {
                            b[i] -= wk * f64::from(y[i]) * x;
                        }
                    }
                }
            }

            if sweep.finish(gmax_new, self.settings.eps) {
                converged = true;
                break;
            }
        }

        let mut objective: f64 = w.iter().map(|wj| wj.abs()).sum();
        for (i, &bi) in b.iter().enumerate() {
            if bi > 0.0 {
                objective += cost[i] * bi * bi;
            }
        }

        SolveResult {
            weights: w,
            iterations: sweep.iter,
            objective,
            converged,
        }
    }

    fn solve_logistic(
        &self,
        columns: &SparseMatrix,
        y: &[i8],
        cost: &[f64],
        rng: &mut ShuffleRng,
    ) -> SolveResult {
        let w_size = columns.n_rows();
        let l = columns.n_cols();
        let mut w = vec![0.0; w_size];
        // exp(w'x_i) per instance
        let mut exp_wtx = vec![1.0; l];
        let mut exp_wtx_new = Vec::with_capacity(l);

        let mut x_min = 0.0_f64;
        let mut xj_max = vec![0.0_f64; w_size];
        let mut c_sum = vec![0.0; w_size];
        let mut xjneg_sum = vec![0.0; w_size];
        let mut xjpos_sum = vec![0.0; w_size];
        for j in 0..w_size {
            let (inst, vals) = columns.row(j);
            for (&i, &x) in inst.iter().zip(vals) {
                x_min = x_min.min(x);
                xj_max[j] = xj_max[j].max(x);
                c_sum[j] += cost[i];
                if y[i] < 0 {
                    xjneg_sum[j] += cost[i] * x;
                } else {
                    xjpos_sum[j] += cost[i] * x;
                }
            }
        }
        // cheap sufficient-decrease bound, valid for non-negative data
        let bounded = x_min >= 0.0;

        let mut sweep = Sweep::new(w_size);
        let mut converged = false;

        while sweep.iter < self.settings.max_iterations {
            let mut gmax_new = 0.0_f64;
            sweep.active.shuffle(rng);

            let mut s = 0;
            while s < sweep.active.len() {
                let j = sweep.active.get(s);
                let (inst, vals) = columns.row(j);

                let mut sum1 = 0.0;
                let mut sum2 = 0.0;
                let mut h = 0.0;
                for (&i, &x) in inst.iter().zip(vals) {
                    let e = exp_wtx[i];
                    let tmp1 = x / (1.0 + e);
                    let tmp2 = cost[i] * tmp1;
                    let tmp3 = tmp2 * e;
                    sum2 += tmp2;
                    sum1 += tmp3;
                    h += tmp1 * tmp3;
                }
                let h = h.max(MIN_CURVATURE);

                let g = -sum2 + xjneg_sum[j];
                let gp = g + 1.0;
                let gn = g - 1.0;

                let Some(v) = violation(w[j], gp, gn, sweep.gmax_old / l as f64) else {
                    sweep.active.shrink(s);
                    continue;
                };
                gmax_new = gmax_new.max(v);
                s += 1;

                let d = newton_direction(w[j], gp, gn, h);
                if d.abs() < 1.0e-12 {
                    continue;
                }
                let mut d = sweep.radius.clip(j, d);
                let mut delta = (w[j] + d).abs() - w[j].abs() + g * d;

                let mut steps = 0;
                let mut accepted = false;
                while steps < MAX_LINE_SEARCH {
                    let mut cond = (w[j] + d).abs() - w[j].abs() - SIGMA * delta;

                    if bounded && xj_max[j] > 0.0 {
                        let tmp = (d * xj_max[j]).exp();
                        let appxcond1 = (1.0 + sum1 * (tmp - 1.0) / xj_max[j] / c_sum[j]).ln()
                            * c_sum[j]
                            + cond
                            - d * xjpos_sum[j];
                        let appxcond2 = (1.0 + sum2 * (1.0 / tmp - 1.0) / xj_max[j] / c_sum[j])
                            .ln()
                            * c_sum[j]
                            + cond
                            + d * xjneg_sum[j];
                        if appxcond1.min(appxcond2) <= 0.0 {
                            for (&i, &x) in inst.iter().zip(vals) {
                                exp_wtx[i] *= (d * x).exp();
                            }
                            accepted = true;
                            break;
                        }
                    }

                    cond += d * xjneg_sum[j];
                    exp_wtx_new.clear();
                    for (&i, &x) in inst.iter().zip(vals) {
                        let exp_dx = (d * x).exp();
                        let e_new = exp_wtx[i] * exp_dx;
                        exp_wtx_new.push(e_new);
                        cond += cost[i] * ((1.0 + e_new) / (exp_dx + e_new)).ln();
                    }

                    if cond <= 0.0 {
                        for (&i, &e_new) in inst.iter().zip(&exp_wtx_new) {
                            exp_wtx[i] = e_new;
                        }
                        accepted = true;
                        break;
                    }
                    d *= 0.5;
                    delta *= 0.5;
                    steps += 1;
                }

                w[j] += d;
                sweep.radius.update(j, d, accepted && steps == 0);

                if !accepted {
                    log::debug!("L1 CD: line search exhausted on feature {j}");
                    exp_wtx.iter_mut().for_each(|e| *e = 0.0);
                    for (k, &wk) in w.iter().enumerate() {
                        if wk == 0.0 {
                            continue;
                        }
                        let (inst, vals) = columns.row(k);
                        for (&i, &x) in inst.iter().zip(vals) {
                            exp_wtx[i] += wk * x;
                        }
                    }
                    exp_wtx.iter_mut().for_each(|e| *e = e.exp());
                }
            }

            if sweep.finish(gmax_new, self.settings.eps) {
                converged = true;
                break;
            }
        }

        let mut objective: f64 = w.iter().map(|wj| wj.abs()).sum();
        for (i, &e) in exp_wtx.iter().enumerate() {
            objective += cost[i]
                * if y[i] > 0 {
                    (1.0 / e).ln_1p()
                } else {
                    e.ln_1p()
                };
        }

        SolveResult {
            weights: w,
            iterations: sweep.iter,
            objective,
            converged,
        }
    }
}
