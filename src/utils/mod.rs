//! Utility routines shared by the solvers, persistence and data loading

pub mod numeric;
pub mod rng;

pub use self::numeric::{format_g, parse_int, parse_real};
pub use self::rng::ShuffleRng;

/// Dot product of a dense vector with sparse `(index, value)` pairs
pub(crate) fn sparse_dot(w: &[f64], indices: &[usize], values: &[f64]) -> f64 {
    indices
        .iter()
        .zip(values.iter())
        .map(|(&j, &v)| w[j] * v)
        .sum()
}

/// `w += scale * x` for sparse `x`
pub(crate) fn sparse_axpy(w: &mut [f64], scale: f64, indices: &[usize], values: &[f64]) {
    for (&j, &v) in indices.iter().zip(values.iter()) {
        w[j] += scale * v;
    }
}

/// Euclidean norm of a dense vector
pub(crate) fn norm2(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Dot product of two dense vectors
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
