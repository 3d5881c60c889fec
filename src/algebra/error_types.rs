use thiserror::Error;

/// Error type returned by sparse matrix assembly operations.
#[derive(Error, Debug)]
pub enum SparseFormatError {
    /// Matrix dimension fields and/or array lengths are incompatible
    #[error("Matrix dimension fields and/or array lengths are incompatible")]
    IncompatibleDimension,
    /// Matrix column pointer values are defective
    #[error("Bad column pointer values")]
    BadColptr,
    /// Row value out of bounds or not sorted within its column
    #[error("Row value out of bounds or not sorted within its column")]
    BadRowval,
}
