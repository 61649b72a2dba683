//! Trust-region Newton method with truncated conjugate gradient steps

use super::objective::ObjectiveFunction;
use super::{SolveResult, SolverSettings};
use crate::utils::{dot, norm2};

/// Conjugate-gradient steps allowed per Newton step
const MAX_CG_ITERATIONS: usize = 1000;

// step acceptance thresholds on actual / predicted reduction
const ETA0: f64 = 1e-4;
const ETA1: f64 = 0.25;
const ETA2: f64 = 0.75;

// trust region update factors
const SIGMA1: f64 = 0.25;
const SIGMA2: f64 = 0.5;
const SIGMA3: f64 = 4.0;

/// Trust-region Newton minimizer
///
/// `settings.eps` is relative: iteration stops once the gradient norm drops
/// below `eps` times the gradient norm at the zero starting point.
#[derive(Debug, Clone)]
pub struct TrustRegionNewton {
    settings: SolverSettings,
}

impl TrustRegionNewton {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// Minimize `objective` starting from `w = 0`
    pub fn minimize(&self, objective: &mut dyn ObjectiveFunction) -> SolveResult {
        let n = objective.dimension();
        let eps = self.settings.eps;
        let max_iter = self.settings.max_iterations;

        let mut w = vec![0.0; n];
        let mut w_new = vec![0.0; n];
        let mut g = vec![0.0; n];
        let mut s = vec![0.0; n];
        let mut r = vec![0.0; n];

        let mut f = objective.fun(&w);
        objective.grad(&w, &mut g);
        let mut delta = norm2(&g);
        let gnorm_initial = delta;
        let mut gnorm = gnorm_initial;

        let mut converged = gnorm <= eps * gnorm_initial;
        let mut iter = 1;

        while iter <= max_iter && !converged {
            let cg_iter = truncated_cg(objective, delta, &g, &mut s, &mut r);

            for ((wn, &wi), &si) in w_new.iter_mut().zip(&w).zip(&s) {
                *wn = wi + si;
            }

            let gs = dot(&g, &s);
            let prered = -0.5 * (gs - dot(&s, &r));
            let f_new = objective.fun(&w_new);
            let actred = f - f_new;

            let snorm = norm2(&s);
            if iter == 1 {
                delta = delta.min(snorm);
            }

            // minimizer of the cubic interpolation along s
            let alpha = if f_new - f - gs <= 0.0 {
                SIGMA3
            } else {
                SIGMA1.max(-0.5 * (gs / (f_new - f - gs)))
            };

            delta = if actred < ETA0 * prered {
                (alpha.max(SIGMA1) * snorm).min(SIGMA2 * delta)
            } else if actred < ETA1 * prered {
                (SIGMA1 * delta).max((alpha * snorm).min(SIGMA2 * delta))
            } else if actred < ETA2 * prered {
                (SIGMA1 * delta).max((alpha * snorm).min(SIGMA3 * delta))
            } else {
                delta.max((alpha * snorm).min(SIGMA3 * delta))
            };

            log::debug!(
                "iter {iter:2} act {actred:5.3e} pre {prered:5.3e} delta {delta:5.3e} f {f:5.3e} |g| {gnorm:5.3e} CG {cg_iter:3}"
            );

            if actred > ETA0 * prered {
                iter += 1;
                std::mem::swap(&mut w, &mut w_new);
                f = f_new;
                objective.grad(&w, &mut g);
                gnorm = norm2(&g);
                if gnorm <= eps * gnorm_initial {
                    converged = true;
                    break;
                }
            }

            if f < -1.0e32 {
                log::warn!("f < -1.0e+32");
                break;
            }
            if actred.abs() <= 0.0 && prered <= 0.0 {
                log::warn!("actred and prered <= 0");
                break;
            }
            if actred.abs() <= 1.0e-12 * f.abs() && prered.abs() <= 1.0e-12 * f.abs() {
                log::warn!("actred and prered too small");
                break;
            }
        }

        if !converged && iter > max_iter {
            log::warn!("reaching max number of Newton iterations ({max_iter})");
        }

        SolveResult {
            weights: w,
            iterations: iter.min(max_iter),
            objective: f,
            converged,
        }
    }
}

/// Approximately solve `min g's + 0.5 s'Hs` subject to `|s| <= delta`
///
/// On return `s` holds the step and `r` the residual `-g - Hs`. Returns the
/// number of conjugate-gradient iterations.
fn truncated_cg(
    objective: &dyn ObjectiveFunction,
    delta: f64,
    g: &[f64],
    s: &mut [f64],
    r: &mut [f64],
) -> usize {
    let n = g.len();
    let mut d = vec![0.0; n];
    let mut hd = vec![0.0; n];

    for j in 0..n {
        s[j] = 0.0;
        r[j] = -g[j];
        d[j] = r[j];
    }
    let cg_tol = 0.1 * norm2(g);
    let mut rtr = dot(r, r);
    let mut cg_iter = 0;

    while cg_iter < MAX_CG_ITERATIONS {
        if rtr.sqrt() <= cg_tol {
            break;
        }
        cg_iter += 1;
        objective.hessian_vector(&d, &mut hd);

        let alpha = rtr / dot(&d, &hd);
        axpy(alpha, &d, s);

        if norm2(s) > delta {
            log::debug!("cg reaches trust region boundary");
            axpy(-alpha, &d, s);

            // step to the boundary along d
            let std = dot(s, &d);
            let sts = dot(s, s);
            let dtd = dot(&d, &d);
            let dsq = delta * delta;
            let rad = (std * std + dtd * (dsq - sts)).sqrt();
            let alpha = if std >= 0.0 {
                (dsq - sts) / (std + rad)
            } else {
                (rad - std) / dtd
            };
            axpy(alpha, &d, s);
            axpy(-alpha, &hd, r);
            break;
        }

        axpy(-alpha, &hd, r);
        let rnew_trnew = dot(r, r);
        let beta = rnew_trnew / rtr;
        for (dj, &rj) in d.iter_mut().zip(r.iter()) {
            *dj = beta * *dj + rj;
        }
        rtr = rnew_trnew;
    }

    cg_iter
}

fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    for (yj, &xj) in y.iter_mut().zip(x) {
        *yj += a * xj;
    }
}
