//! Shrinking bookkeeping shared by the coordinate-descent solvers
//!
//! Variables that sit at a bound and look unlikely to move are swapped to
//! the tail of an index permutation and skipped by later sweeps. Once the
//! remaining active set converges, everything is reactivated and the
//! optimality check is repeated on the full problem.

use crate::utils::ShuffleRng;

/// Index permutation whose prefix holds the active variables
#[derive(Debug, Clone)]
pub struct ActiveSet {
    order: Vec<usize>,
    active: usize,
}

impl ActiveSet {
    /// All `n` variables active, in natural order
    pub fn new(n: usize) -> Self {
        Self {
            order: (0..n).collect(),
            active: n,
        }
    }

    /// Number of active variables
    pub fn len(&self) -> usize {
        self.active
    }

    /// Whether no variable is active
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Total number of variables
    pub fn total(&self) -> usize {
        self.order.len()
    }

    /// Whether every variable is active
    pub fn is_full(&self) -> bool {
        self.active == self.order.len()
    }

    /// Variable at position `s` of the active prefix
    #[inline]
    pub fn get(&self, s: usize) -> usize {
        self.order[s]
    }

    /// Randomize the sweep order of the active variables
    pub fn shuffle(&mut self, rng: &mut ShuffleRng) {
        rng.shuffle_prefix(&mut self.order, self.active);
    }

    /// Deactivate the variable at position `s`
    ///
    /// The last active variable moves into position `s`, so a sweep must
    /// revisit `s` instead of advancing.
    pub fn shrink(&mut self, s: usize) {
        self.active -= 1;
        self.order.swap(s, self.active);
    }

    /// Make every variable active again
    pub fn reactivate_all(&mut self) {
        self.active = self.order.len();
    }
}

/// Projected-gradient extremes of the previous sweep
///
/// A variable at its lower bound whose gradient exceeds `max` (or at its
/// upper bound with gradient below `min`) is shrunk.
#[derive(Debug, Clone, Copy)]
pub struct GradientWindow {
    pub max: f64,
    pub min: f64,
}

impl GradientWindow {
    /// Window that never triggers shrinking
    pub fn unbounded() -> Self {
        Self {
            max: f64::INFINITY,
            min: f64::NEG_INFINITY,
        }
    }

    /// Disable shrinking until the next sweep completes
    pub fn reset(&mut self) {
        *self = Self::unbounded();
    }

    /// Adopt the extremes of the sweep that just finished
    pub fn advance(&mut self, max: f64, min: f64) {
        self.max = if max <= 0.0 { f64::INFINITY } else { max };
        self.min = if min >= 0.0 { f64::NEG_INFINITY } else { min };
    }
}
