//! Sparse matrix types and numeric traits used by the factorization core.

mod error_types;
mod floats;
pub use error_types::*;
pub use floats::*;

mod csc;
pub use csc::*;
