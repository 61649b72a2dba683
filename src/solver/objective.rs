//! Smooth L2-regularized primal objectives for the trust-region solver
//!
//! Both objectives have the form `0.5 * w'w + sum_i C_i * loss(y_i w'x_i)`.
//! Hessian-vector products are formed from the sparse rows and a diagonal
//! per-instance weight, so the Hessian is never materialized.

use crate::data::SparseMatrix;
use crate::utils::{sparse_axpy, sparse_dot};

/// Twice-differentiable function minimized by [`TrustRegionNewton`]
///
/// Calls come in a fixed order: `fun(w)` evaluates at a point and caches
/// the margins, `grad(w)` must follow at the same point and refreshes the
/// curvature state that `hessian_vector` uses.
///
/// [`TrustRegionNewton`]: super::TrustRegionNewton
pub trait ObjectiveFunction {
    /// Objective value at `w`
    fn fun(&mut self, w: &[f64]) -> f64;

    /// Gradient at the point of the last `fun` call
    fn grad(&mut self, w: &[f64], g: &mut [f64]);

    /// Hessian (at the point of the last `grad` call) times `s`
    fn hessian_vector(&self, s: &[f64], hs: &mut [f64]);

    /// Number of variables
    fn dimension(&self) -> usize;
}

fn margins(rows: &SparseMatrix, w: &[f64], z: &mut [f64]) {
    for (i, zi) in z.iter_mut().enumerate() {
        let (cols, vals) = rows.row(i);
        *zi = sparse_dot(w, cols, vals);
    }
}

/// L2-regularized logistic loss
#[derive(Debug)]
pub struct LogisticLoss<'a> {
    rows: &'a SparseMatrix,
    y: &'a [i8],
    cost: &'a [f64],
    z: Vec<f64>,
    d: Vec<f64>,
}

impl<'a> LogisticLoss<'a> {
    pub fn new(rows: &'a SparseMatrix, y: &'a [i8], cost: &'a [f64]) -> Self {
        let l = rows.n_rows();
        Self {
            rows,
            y,
            cost,
            z: vec![0.0; l],
            d: vec![0.0; l],
        }
    }
}

impl ObjectiveFunction for LogisticLoss<'_> {
    fn fun(&mut self, w: &[f64]) -> f64 {
        margins(self.rows, w, &mut self.z);
        let mut f = 0.5 * w.iter().map(|v| v * v).sum::<f64>();
        for i in 0..self.z.len() {
            let yz = f64::from(self.y[i]) * self.z[i];
            // log(1 + exp(-yz)) without overflow
            f += self.cost[i]
                * if yz >= 0.0 {
                    (-yz).exp().ln_1p()
                } else {
                    -yz + yz.exp().ln_1p()
                };
        }
        f
    }

    fn grad(&mut self, w: &[f64], g: &mut [f64]) {
        g.copy_from_slice(w);
        for i in 0..self.z.len() {
            let yi = f64::from(self.y[i]);
            let sigma = 1.0 / (1.0 + (-yi * self.z[i]).exp());
            self.d[i] = sigma * (1.0 - sigma);
            let coef = self.cost[i] * (sigma - 1.0) * yi;
            let (cols, vals) = self.rows.row(i);
            sparse_axpy(g, coef, cols, vals);
        }
    }

    fn hessian_vector(&self, s: &[f64], hs: &mut [f64]) {
        hs.copy_from_slice(s);
        for i in 0..self.d.len() {
            let (cols, vals) = self.rows.row(i);
            let coef = self.cost[i] * self.d[i] * sparse_dot(s, cols, vals);
            sparse_axpy(hs, coef, cols, vals);
        }
    }

    fn dimension(&self) -> usize {
        self.rows.n_cols()
    }
}

/// L2-regularized squared hinge loss
#[derive(Debug)]
pub struct SquaredHingeLoss<'a> {
    rows: &'a SparseMatrix,
    y: &'a [i8],
    cost: &'a [f64],
    z: Vec<f64>,
    /// Instances with margin below one at the last gradient
    violators: Vec<usize>,
}

impl<'a> SquaredHingeLoss<'a> {
    pub fn new(rows: &'a SparseMatrix, y: &'a [i8], cost: &'a [f64]) -> Self {
        Self {
            rows,
            y,
            cost,
            z: vec![0.0; rows.n_rows()],
            violators: Vec::new(),
        }
    }
}

impl ObjectiveFunction for SquaredHingeLoss<'_> {
    fn fun(&mut self, w: &[f64]) -> f64 {
        margins(self.rows, w, &mut self.z);
        let mut f = 0.5 * w.iter().map(|v| v * v).sum::<f64>();
        for i in 0..self.z.len() {
            self.z[i] *= f64::from(self.y[i]);
            let slack = 1.0 - self.z[i];
            if slack > 0.0 {
                f += self.cost[i] * slack * slack;
            }
        }
        f
    }

    fn grad(&mut self, w: &[f64], g: &mut [f64]) {
        g.copy_from_slice(w);
        self.violators.clear();
        for i in 0..self.z.len() {
            if self.z[i] < 1.0 {
                self.violators.push(i);
                let coef = 2.0 * self.cost[i] * f64::from(self.y[i]) * (self.z[i] - 1.0);
                let (cols, vals) = self.rows.row(i);
                sparse_axpy(g, coef, cols, vals);
            }
        }
    }

    fn hessian_vector(&self, s: &[f64], hs: &mut [f64]) {
        hs.copy_from_slice(s);
        for &i in &self.violators {
            let (cols, vals) = self.rows.row(i);
            let coef = 2.0 * self.cost[i] * sparse_dot(s, cols, vals);
            sparse_axpy(hs, coef, cols, vals);
        }
    }

    fn dimension(&self) -> usize {
        self.rows.n_cols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn data() -> (SparseMatrix, Vec<i8>, Vec<f64>) {
        let rows = SparseMatrix::from_rows(
            2,
            &[
                vec![(0, 1.0), (1, 0.5)],
                vec![(1, -2.0)],
                vec![(0, -1.5), (1, 1.0)],
            ],
        );
        (rows, vec![1, -1, -1], vec![1.0, 2.0, 0.5])
    }

    /// Central differences of `fun` against `grad`
    fn check_gradient(f: &mut dyn ObjectiveFunction, w: &[f64]) {
        let n = f.dimension();
        let mut g = vec![0.0; n];
        f.fun(w);
        f.grad(w, &mut g);

        let h = 1e-6;
        for j in 0..n {
            let mut plus = w.to_vec();
            let mut minus = w.to_vec();
            plus[j] += h;
            minus[j] -= h;
            let numeric = (f.fun(&plus) - f.fun(&minus)) / (2.0 * h);
            assert_relative_eq!(g[j], numeric, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_logistic_value_at_zero() {
        let (rows, y, cost) = data();
        let mut f = LogisticLoss::new(&rows, &y, &cost);
        let total: f64 = cost.iter().sum();
        assert_relative_eq!(f.fun(&[0.0, 0.0]), total * 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_logistic_gradient() {
        let (rows, y, cost) = data();
        let mut f = LogisticLoss::new(&rows, &y, &cost);
        check_gradient(&mut f, &[0.3, -0.7]);
    }

    #[test]
    fn test_squared_hinge_gradient() {
        let (rows, y, cost) = data();
        let mut f = SquaredHingeLoss::new(&rows, &y, &cost);
        check_gradient(&mut f, &[0.3, -0.7]);
    }

    #[test]
    fn test_logistic_large_margin_is_finite() {
        let (rows, y, cost) = data();
        let mut f = LogisticLoss::new(&rows, &y, &cost);
        let value = f.fun(&[1000.0, -1000.0]);
        assert!(value.is_finite());
    }

    #[test]
    fn test_hessian_vector_matches_gradient_difference() {
        let (rows, y, cost) = data();
        let mut f = LogisticLoss::new(&rows, &y, &cost);
        let w = [0.2, 0.1];
        let s = [1.0, -0.5];
        let h = 1e-6;

        let mut g0 = vec![0.0; 2];
        f.fun(&w);
        f.grad(&w, &mut g0);
        let mut hs = vec![0.0; 2];
        f.hessian_vector(&s, &mut hs);

        let shifted: Vec<f64> = w.iter().zip(&s).map(|(a, b)| a + h * b).collect();
        let mut g1 = vec![0.0; 2];
        f.fun(&shifted);
        f.grad(&shifted, &mut g1);

        for j in 0..2 {
            assert_relative_eq!(hs[j], (g1[j] - g0[j]) / h, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_squared_hinge_ignores_satisfied_margins() {
        let rows = SparseMatrix::from_rows(1, &[vec![(0, 1.0)], vec![(0, -1.0)]]);
        let y = vec![1, -1];
        let cost = vec![1.0, 1.0];
        let mut f = SquaredHingeLoss::new(&rows, &y, &cost);

        // both margins are 2, only the regularizer remains
        let w = [2.0];
        assert_relative_eq!(f.fun(&w), 2.0);
        let mut g = vec![0.0];
        f.grad(&w, &mut g);
        assert_relative_eq!(g[0], 2.0);
        let mut hs = vec![0.0];
        f.hessian_vector(&[1.0], &mut hs);
        assert_relative_eq!(hs[0], 1.0);
    }
}
