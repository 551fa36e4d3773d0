//! Dense (C2) and sparse (C3) index implementations.

pub mod dense;
pub mod sparse;

pub use dense::DenseIndex;
pub use sparse::SparseIndex;
