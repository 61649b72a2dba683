//! Crammer-Singer multi-class SVM, solved in the dual
//!
//! Every instance owns one dual variable per class. For instance `i` the
//! variables sum to zero, `alpha_im <= 0` for `m != y_i` and
//! `alpha_iy <= C_i`. Classes whose variable sits at its bound are shrunk
//! per instance, and an instance with at most one active class leaves the
//! sweep until the next reactivation.

use super::{SolveResult, SolverSettings};
use crate::data::SparseMatrix;
use crate::utils::ShuffleRng;

/// Joint multi-class solver
#[derive(Debug, Clone)]
pub struct CrammerSinger {
    settings: SolverSettings,
}

/// Per-instance class bookkeeping for shrinking
struct ClassOrder {
    nr_class: usize,
    /// `order[i * nr_class + m]` is the class at position `m` for instance `i`
    order: Vec<usize>,
    /// Position of the true class of each instance within its order
    y_pos: Vec<usize>,
    /// Number of active classes per instance
    active: Vec<usize>,
}

impl ClassOrder {
    fn new(class_of: &[usize], nr_class: usize) -> Self {
        let l = class_of.len();
        Self {
            nr_class,
            order: (0..l).flat_map(|_| 0..nr_class).collect(),
            y_pos: class_of.to_vec(),
            active: vec![nr_class; l],
        }
    }

    fn reactivate_all(&mut self) {
        self.active.iter_mut().for_each(|a| *a = self.nr_class);
    }
}

impl CrammerSinger {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// Solve for class positions `class_of` in `0..nr_class`
    ///
    /// The weights are feature-major: `weights[j * nr_class + m]`.
    pub fn solve(
        &self,
        rows: &SparseMatrix,
        class_of: &[usize],
        nr_class: usize,
        cost: &[f64],
        rng: &mut ShuffleRng,
    ) -> SolveResult {
        let l = rows.n_rows();
        let eps = self.settings.eps;
        let max_iter = self.settings.max_iterations;

        let mut w = vec![0.0; rows.n_cols() * nr_class];
        let mut alpha = vec![0.0; l * nr_class];
        let qd = rows.row_norms_squared();

        let mut g = vec![0.0; nr_class];
        let mut b = vec![0.0; nr_class];
        let mut alpha_new = vec![0.0; nr_class];
        let mut changed: Vec<(usize, f64)> = Vec::with_capacity(nr_class);

        let mut classes = ClassOrder::new(class_of, nr_class);
        let mut index: Vec<usize> = (0..l).collect();
        let mut active_size = l;
        let mut eps_shrink = (10.0 * eps).max(1.0);
        let mut start_from_all = true;
        let mut iter = 0;
        let mut converged = false;

        while iter < max_iter {
            let mut stopping = f64::NEG_INFINITY;
            rng.shuffle_prefix(&mut index, active_size);

            let mut s = 0;
            while s < active_size {
                let i = index[s];
                let a_i = qd[i];
                let base = i * nr_class;
                let c_i = cost[i];

                if a_i > 0.0 {
                    let (cols, vals) = rows.row(i);
                    let order = &mut classes.order[base..base + nr_class];
                    let y_pos = &mut classes.y_pos[i];
                    let act = &mut classes.active[i];

                    for gm in g.iter_mut().take(*act) {
                        *gm = 1.0;
                    }
                    if *y_pos < *act {
                        g[*y_pos] = 0.0;
                    }
                    for (&j, &x) in cols.iter().zip(vals) {
                        let w_j = &w[j * nr_class..(j + 1) * nr_class];
                        for m in 0..*act {
                            g[m] += w_j[order[m]] * x;
                        }
                    }

                    let mut min_g = f64::INFINITY;
                    let mut max_g = f64::NEG_INFINITY;
                    for m in 0..*act {
                        if alpha[base + order[m]] < 0.0 && g[m] < min_g {
                            min_g = g[m];
                        }
                        max_g = max_g.max(g[m]);
                    }
                    if *y_pos < *act
                        && alpha[base + class_of[i]] < c_i
                        && g[*y_pos] < min_g
                    {
                        min_g = g[*y_pos];
                    }

                    let at_bound = |pos: usize, y_pos: usize, value: f64, gm: f64| {
                        let bound = if pos == y_pos { c_i } else { 0.0 };
                        value == bound && gm < min_g
                    };

                    let mut m = 0;
                    while m < *act {
                        if at_bound(m, *y_pos, alpha[base + order[m]], g[m]) {
                            *act -= 1;
                            while *act > m {
                                let last = *act;
                                if !at_bound(last, *y_pos, alpha[base + order[last]], g[last]) {
                                    order.swap(m, last);
                                    g.swap(m, last);
                                    if *y_pos == last {
                                        *y_pos = m;
                                    } else if *y_pos == m {
                                        *y_pos = last;
                                    }
                                    break;
                                }
                                *act -= 1;
                            }
                        }
                        m += 1;
                    }

                    if *act <= 1 {
                        active_size -= 1;
                        index.swap(s, active_size);
                        continue;
                    }

                    if max_g - min_g <= 1.0e-12 {
                        s += 1;
                        continue;
                    }
                    stopping = stopping.max(max_g - min_g);

                    for m in 0..*act {
                        b[m] = g[m] - a_i * alpha[base + order[m]];
                    }
                    solve_sub_problem(a_i, *y_pos, c_i, &b[..*act], &mut alpha_new[..*act]);

                    changed.clear();
                    for m in 0..*act {
                        let slot = base + order[m];
                        let d = alpha_new[m] - alpha[slot];
                        alpha[slot] = alpha_new[m];
                        if d.abs() >= 1.0e-12 {
                            changed.push((order[m], d));
                        }
                    }
                    for (&j, &x) in cols.iter().zip(vals) {
                        let w_j = &mut w[j * nr_class..(j + 1) * nr_class];
                        for &(class, d) in &changed {
                            w_j[class] += d * x;
                        }
                    }
                }
                s += 1;
            }

            iter += 1;

            if stopping < eps_shrink {
                if stopping < eps && start_from_all {
                    converged = true;
                    break;
                }
                active_size = l;
                classes.reactivate_all();
                log::debug!("MCSVM: reactivating all instances at iteration {iter}");
                eps_shrink = (eps_shrink / 2.0).max(eps);
                start_from_all = true;
            } else {
                start_from_all = false;
            }
        }

        if !converged {
            log::warn!("reaching max number of iterations ({max_iter})");
        }

        let mut objective = 0.5 * w.iter().map(|v| v * v).sum::<f64>();
        let mut n_sv = 0;
        for (k, &a) in alpha.iter().enumerate() {
            objective += a;
            if a.abs() > 0.0 {
                n_sv += 1;
            }
            if k % nr_class == class_of[k / nr_class] {
                objective -= a;
            }
        }
        log::info!("MCSVM: {iter} iterations, objective {objective}, nSV {n_sv}");

        SolveResult {
            weights: w,
            iterations: iter,
            objective,
            converged,
        }
    }
}

/// Exact minimizer of the per-instance quadratic over the shifted simplex
///
/// `b` holds `G_m - A * alpha_m` for the active classes and `y_pos` the
/// position of the true class (or `>= b.len()` if it is shrunk).
fn solve_sub_problem(a_i: f64, y_pos: usize, c_y: f64, b: &[f64], alpha_new: &mut [f64]) {
    let active = b.len();
    let mut d = b.to_vec();
    if y_pos < active {
        d[y_pos] += a_i * c_y;
    }
    d.sort_by(|x, y| y.total_cmp(x));

    let mut beta = d[0] - a_i * c_y;
    let mut r = 1;
    while r < active && beta < r as f64 * d[r] {
        beta += d[r];
        r += 1;
    }
    beta /= r as f64;

    for (m, out) in alpha_new.iter_mut().enumerate() {
        let step = (beta - b[m]) / a_i;
        *out = if m == y_pos { c_y.min(step) } else { step.min(0.0) };
    }
}
