//! __sparsechol__ computes sparse Cholesky factorizations of symmetric
//! positive (semi-)definite matrices using a fill-reducing ordering and an
//! optional diagonal regularization shift.
//!
//! Given a sparse symmetric matrix `A` and a scalar `eps >= 0`, the crate
//! produces a sparse lower triangular factor `L` with strictly positive
//! diagonal and a row permutation `p` satisfying
//!
//! ```text
//! (L[p,:]) * (L[p,:])' == A + eps*I
//! ```
//!
//! to numerical tolerance.  Matrices that are positive semi-definite but
//! singular are reported as such, so that callers can retry with
//! `eps > 0`.  Indefinite matrices are rejected outright, since no
//! diagonal shift can rescue negative curvature.
//!
//! # Example
//!
//! ```
//! use sparsechol::algebra::CscMatrix;
//! use sparsechol::cholesky::sparse_cholesky;
//!
//! // A = [2. 1.]
//! //     [1. 2.]
//! let A = CscMatrix::new(
//!     2,                    // m
//!     2,                    // n
//!     vec![0, 2, 4],        // colptr
//!     vec![0, 1, 0, 1],     // rowval
//!     vec![2., 1., 1., 2.], // nzval
//! );
//!
//! let chol = sparse_cholesky(&A, 0.0).unwrap();
//! assert!(chol.L.is_tril());
//! ```
//!
//! # License
//!
//! Licensed under Apache License, Version 2.0.

pub mod algebra;
pub mod cholesky;
