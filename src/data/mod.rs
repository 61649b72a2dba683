//! Data loading and sparse storage
//!
//! This module reads problems in the libsvm text format and packs them into
//! the compressed layouts the solvers iterate over.

pub mod libsvm;
pub mod sparse;

pub use self::libsvm::read_instance_weights;
pub use self::sparse::SparseMatrix;
