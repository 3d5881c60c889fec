//! Sparse Cholesky factorization of symmetric positive (semi-)definite
//! matrices.
//!
//! The factorization runs in two stages: an ordering stage that computes a
//! fill-reducing permutation of the matrix indices, and a numerical stage
//! that factors the permuted, optionally regularized matrix into a sparse
//! lower triangular factor with strictly positive diagonal.  Both stages
//! are invoked through the single entry point [`sparse_cholesky`] (or
//! [`SparseCholesky::new`] for non-default settings).
//!
//! Matrices that are not strictly factorable are rejected with a
//! [`CholeskyError`] distinguishing singularity (rescuable by a positive
//! diagonal shift) from indefiniteness (not rescuable).

mod factor;
mod ordering;
pub use factor::*;
pub use ordering::{ipermute, permute};
