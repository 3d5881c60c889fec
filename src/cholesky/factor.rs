#![allow(non_snake_case)]
use crate::algebra::{AsFloatT, CscMatrix, FloatT};
use crate::cholesky::ordering::{fill_reducing_ordering, invperm, permute_symmetric};
use derive_builder::Builder;
use std::iter::zip;
use thiserror::Error;

/// Error codes returnable from [`sparse_cholesky`](sparse_cholesky)
///
/// Both variants are detected during pivot computation and are raised
/// before any factor is assembled, so a failed call never returns a
/// partial result.  Callers should branch on the variant, not on the
/// message text.

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CholeskyError {
    /// The matrix is positive semi-definite but numerically singular.
    /// A positive regularization shift would produce a factor.
    #[error("Matrix is singular: positive semi-definite but not positive definite")]
    SingularMatrix,
    /// The matrix has at least one negative eigenvalue.  No diagonal
    /// regularization supported here can produce a factor.
    #[error("Matrix is indefinite")]
    IndefiniteMatrix,
}

/// Optional settings for [`sparse_cholesky`](sparse_cholesky)

#[derive(Builder, Debug, Clone)]
pub struct CholeskySettings {
    /// scaling applied to the AMD dense-row threshold
    #[builder(default = "1.0")]
    amd_dense_scale: f64,
    /// explicit fill-reducing ordering, overriding AMD.  Must be a
    /// permutation of `0..n`.  Pass `(0..n).collect()` for no reordering.
    #[builder(default = "None", setter(strip_option))]
    perm: Option<Vec<usize>>,
}

impl Default for CholeskySettings {
    fn default() -> CholeskySettings {
        CholeskySettingsBuilder::default().build().unwrap()
    }
}

/// Result of a successful sparse Cholesky factorization.
///
/// Letting `p` denote [`perm`](SparseCholesky::perm), the factor satisfies
///
/// ```text
/// (L[p,:]) * (L[p,:])' == A + eps*I
/// ```
///
/// to numerical tolerance, where `A` and `eps` are the factored matrix and
/// the regularization shift supplied at the call site.  `L` is lower
/// triangular with strictly positive diagonal entries.

#[derive(Debug, Clone)]
pub struct SparseCholesky<T = f64> {
    /// sparse lower triangular factor with strictly positive diagonal
    pub L: CscMatrix<T>,
    /// row permutation of `L` in the reconstruction identity
    pub perm: Vec<usize>,
}

/// Factor a sparse symmetric matrix `A`, returning a lower triangular `L`
/// and a row permutation `p` with `(L[p,:]) * (L[p,:])' == A + eps*I`.
///
/// `A` must be square and contain at least its upper triangle; entries
/// below the diagonal are ignored.  `eps` is a non-negative diagonal
/// regularization shift: `0` requests a strict factorization that fails
/// with [`CholeskyError::SingularMatrix`] on a positive semi-definite but
/// singular input, while `eps > 0` shifts the diagonal first and so
/// tolerates near-singularity.  Indefinite inputs fail with
/// [`CholeskyError::IndefiniteMatrix`] for every `eps`.
///
/// The input matrix is not modified and all outputs are freshly allocated,
/// so concurrent calls on independent inputs are safe.
///
/// # Panics
/// Panics on caller contract violations: a non-square or malformed matrix,
/// a dimension of zero, or a negative `eps`.
pub fn sparse_cholesky<T: FloatT>(
    A: &CscMatrix<T>,
    eps: T,
) -> Result<SparseCholesky<T>, CholeskyError> {
    SparseCholesky::new(A, eps, None)
}

impl<T> SparseCholesky<T>
where
    T: FloatT,
{
    /// Same as [`sparse_cholesky`](sparse_cholesky), with optional settings
    /// controlling the ordering stage.
    pub fn new(
        A: &CscMatrix<T>,
        eps: T,
        opts: Option<CholeskySettings>,
    ) -> Result<SparseCholesky<T>, CholeskyError> {
        assert!(A.is_square(), "matrix must be square");
        assert!(A.nrows() >= 1, "matrix dimension must be at least 1");
        assert!(A.check_format().is_ok(), "matrix data is malformed");
        assert!(eps >= T::zero(), "regularization must be non-negative");

        let opts = opts.unwrap_or_default();
        let n = A.nrows();

        // canonical factorization target: the upper triangle with a
        // structural diagonal entry in every column, shifted by eps
        let M = triu_with_shifted_diagonal(A, eps);
        let tol = pivot_tolerance(&M);

        // fill-reducing ordering, unless the caller supplied one.
        // only the inverse is consumed from here on
        let iperm = match opts.perm {
            Some(perm) => {
                assert_eq!(perm.len(), n, "permutation length must match dimension");
                invperm(&perm)
            }
            None => fill_reducing_ordering(&M, opts.amd_dense_scale).1,
        };

        // symmetric reordering of the target, still upper triangular
        let Mp = permute_symmetric(&M, &iperm);

        // symbolic stage: elimination tree and per-column factor counts
        let (etree, Lnz) = elimination_tree(&Mp);

        // numerical stage: up-looking LDL' sweep with pivot checks
        let ldl = ldl_factor(&Mp, &etree, &Lnz, eps == T::zero(), tol)?;

        // fold sqrt(D) into the unit lower triangular factor
        let L = assemble_factor(&ldl);

        Ok(SparseCholesky { L, perm: iperm })
    }
}

// Builds the canonical upper triangular factorization target from a full
// symmetric (or already upper triangular) matrix.  Columns missing a
// structural diagonal entry get an explicit slot so that the shift and the
// pivot initialization always have somewhere to land.
fn triu_with_shifted_diagonal<T: FloatT>(A: &CscMatrix<T>, eps: T) -> CscMatrix<T> {
    let triu = A.to_triu();
    let n = triu.ncols();

    let missing = (0..n)
        .filter(|&col| {
            let first = triu.colptr[col];
            let last = triu.colptr[col + 1];
            first == last || triu.rowval[last - 1] != col
        })
        .count();

    let mut M = CscMatrix::spalloc(n, n, triu.nnz() + missing);
    let mut ptr = 0;

    for col in 0..n {
        M.colptr[col] = ptr;

        let first = triu.colptr[col];
        let last = triu.colptr[col + 1];

        // in a sorted upper triangular column the diagonal entry, if
        // present, is the last one
        let has_diag = first < last && triu.rowval[last - 1] == col;
        let above = if has_diag { last - 1 } else { last };

        for idx in first..above {
            M.rowval[ptr] = triu.rowval[idx];
            M.nzval[ptr] = triu.nzval[idx];
            ptr += 1;
        }

        let dval = if has_diag { triu.nzval[last - 1] } else { T::zero() };
        M.rowval[ptr] = col;
        M.nzval[ptr] = dval + eps;
        ptr += 1;
    }
    M.colptr[n] = ptr;

    M
}

// Dynamic tolerance separating acceptable pivots from numerically zero
// ones, scaled by the largest diagonal magnitude of the target matrix.
// `M` must be canonical, i.e. with the diagonal entry last in each column.
fn pivot_tolerance<T: FloatT>(M: &CscMatrix<T>) -> T {
    let mut scale = T::one();
    for col in 0..M.ncols() {
        scale = T::max(scale, T::abs(M.nzval[M.colptr[col + 1] - 1]));
    }
    scale * T::epsilon() * (10 * M.ncols()).as_T()
}

// Classifies a computed pivot.  Pivots above the tolerance are accepted.
// At eps == 0 a pivot within the tolerance band around zero indicates a
// singular matrix, which a positive shift would rescue.  Anything else is
// negative curvature: either a pivot clearly below zero, or a non-positive
// pivot that survived a positive shift.
fn accept_pivot<T: FloatT>(d: T, eps_is_zero: bool, tol: T) -> Result<(), CholeskyError> {
    if d > tol {
        Ok(())
    } else if eps_is_zero && d >= -tol {
        Err(CholeskyError::SingularMatrix)
    } else {
        Err(CholeskyError::IndefiniteMatrix)
    }
}

const UNKNOWN: usize = usize::MAX;
const USED: bool = true;
const UNUSED: bool = false;

// Computes the elimination tree of an upper triangular matrix in
// compressed sparse column form, together with the number of
// below-diagonal nonzeros in each column of its factor.
fn elimination_tree<T: FloatT>(M: &CscMatrix<T>) -> (Vec<usize>, Vec<usize>) {
    let n = M.ncols();
    let Ap = &M.colptr;
    let Ai = &M.rowval;

    let mut work = vec![0usize; n];
    let mut Lnz = vec![0usize; n];
    let mut etree = vec![UNKNOWN; n];

    for j in 0..n {
        work[j] = j;
        for istart in Ai.iter().take(Ap[j + 1]).skip(Ap[j]) {
            let mut i = *istart;

            while work[i] != j {
                if etree[i] == UNKNOWN {
                    etree[i] = j;
                }
                Lnz[i] += 1; // nonzeros in this column
                work[i] = j;
                i = etree[i];
            }
        }
    }

    (etree, Lnz)
}

// Unit lower triangular factor and diagonal of an LDL' factorization,
// as produced by ldl_factor.  The implied unit diagonal of L is not stored.
struct LdlFactors<T> {
    Lp: Vec<usize>,
    Li: Vec<usize>,
    Lx: Vec<T>,
    D: Vec<T>,
}

// Up-looking LDL' factorization of the permuted upper triangular target,
// following the QDLDL scheme: for each row k, solve a small triangular
// system against the rows computed so far, guided by the elimination tree.
// Aborts with a typed error on the first unacceptable pivot.
fn ldl_factor<T: FloatT>(
    M: &CscMatrix<T>,
    etree: &[usize],
    Lnz: &[usize],
    eps_is_zero: bool,
    tol: T,
) -> Result<LdlFactors<T>, CholeskyError> {
    let n = M.ncols();
    let Ap = &M.colptr;
    let Ai = &M.rowval;
    let Ax = &M.nzval;

    let sumLnz: usize = Lnz.iter().sum();
    let mut Lp = vec![0usize; n + 1];
    let mut Li = vec![0usize; sumLnz];
    let mut Lx = vec![T::zero(); sumLnz];
    let mut D = vec![T::zero(); n];
    let mut Dinv = vec![T::zero(); n];

    // workspace for the sparse triangular solves
    let mut y_markers = vec![UNUSED; n];
    let mut y_vals = vec![T::zero(); n];
    let mut y_idx = vec![0usize; n];
    let mut elim_buffer = vec![0usize; n];
    let mut next_colspace = vec![0usize; n];

    //set Lp to cumsum(Lnz), starting from zero
    let mut acc = 0;
    for (Lp, Lnz) in zip(&mut Lp[1..], Lnz) {
        *Lp = acc + Lnz;
        acc = *Lp;
    }

    // in each column of L, the next available space
    // to start is just the first space in the column
    next_colspace.copy_from_slice(&Lp[0..n]);

    // First element of the diagonal D.  Column 0 of an upper triangular
    // matrix holds only the diagonal entry.
    D[0] = Ax[0];
    accept_pivot(D[0], eps_is_zero, tol)?;
    Dinv[0] = T::recip(D[0]);

    // Start from the second row (k=1) here. The upper LH corner is
    // trivially 0 in L b/c we are only computing subdiagonal elements
    for k in 1..n {
        // NB : For each k, we compute a solution to
        // y = L(0:(k-1),0:k-1))\b, where b is the kth
        // column of A that sits above the diagonal.
        // The solution y is then the kth row of L,
        // with an implied '1' at the diagonal entry.

        // number of nonzeros in this row of L
        let mut nnz_y = 0;

        // This loop determines where nonzeros
        // will go in the kth row of L, but doesn't
        // compute the actual values

        for i in Ap[k]..Ap[k + 1] {
            let bidx = Ai[i]; //we are working on this element of b

            // Initialize D[k] as the element of this column
            // corresponding to the diagonal place.  Don't use
            // this element as part of the elimination step
            // that computes the k^th row of L
            if bidx == k {
                D[k] = Ax[i];
                continue;
            }

            y_vals[bidx] = Ax[i]; // initialise y(bidx) = b(bidx)

            // use the forward elimination tree to figure
            // out which elements must be eliminated after
            // this element of b
            let next_idx = bidx;

            if y_markers[next_idx] == UNUSED {
                //this y term not already visited

                y_markers[next_idx] = USED; //I touched this one
                elim_buffer[0] = next_idx; // It goes at the start of the current list
                let mut nnz_e = 1; //length of unvisited elimination path from here

                let mut next_idx = etree[bidx];

                while next_idx != UNKNOWN && next_idx < k {
                    if y_markers[next_idx] == USED {
                        break;
                    }

                    y_markers[next_idx] = USED; // I touched this one
                    elim_buffer[nnz_e] = next_idx; // It goes in the current list
                    next_idx = etree[next_idx]; // one step further along tree
                    nnz_e += 1; // the list is one longer than before
                }

                // now put the buffered elimination list into
                // my current ordering in reverse order
                while nnz_e != 0 {
                    nnz_e -= 1;
                    y_idx[nnz_y] = elim_buffer[nnz_e];
                    nnz_y += 1;
                }
            }
        }

        // This for loop places nonzero values in the k^th row
        for i in (0..nnz_y).rev() {
            // which column are we working on?
            let cidx = y_idx[i];

            // loop along the elements in this
            // column of L and subtract to solve to y
            let tmp_idx = next_colspace[cidx];
            let y_vals_cidx = y_vals[cidx];

            let (f, l) = (Lp[cidx], tmp_idx);
            unsafe {
                //Safety : Here the Lij index comes from the rowval
                //field of the sparse L factor matrix, and should
                //always be bounded by the matrix dimension.
                for j in f..l {
                    let Lxj = *Lx.get_unchecked(j);
                    let Lij = *Li.get_unchecked(j);
                    *(y_vals.get_unchecked_mut(Lij)) -= Lxj * y_vals_cidx;
                }
            }

            // Now I have the cidx^th element of y = L\b.
            // so compute the corresponding element of
            // this row of L and put it into the right place
            Lx[tmp_idx] = y_vals_cidx * Dinv[cidx];
            D[k] -= y_vals_cidx * Lx[tmp_idx];

            // record which row it went into
            Li[tmp_idx] = k;
            next_colspace[cidx] += 1;

            // reset the y_vals and indices back to zero and UNUSED
            // once I'm done with them
            y_vals[cidx] = T::zero();
            y_markers[cidx] = UNUSED;
        }

        accept_pivot(D[k], eps_is_zero, tol)?;
        Dinv[k] = T::recip(D[k]);
    } //end for k

    Ok(LdlFactors { Lp, Li, Lx, D })
}

// Assembles the Cholesky factor L = (I + L1)*sqrt(D) in CSC form from the
// unit lower triangular LDL' factors.  Every pivot in D has already been
// accepted as strictly positive.  Column j holds the diagonal entry
// sqrt(D[j]) first, followed by the subdiagonal entries in increasing row
// order, so the result is a well-formed CSC matrix.
fn assemble_factor<T: FloatT>(ldl: &LdlFactors<T>) -> CscMatrix<T> {
    let n = ldl.D.len();
    let mut L = CscMatrix::spalloc(n, n, n + ldl.Lp[n]);

    let mut ptr = 0;
    for col in 0..n {
        L.colptr[col] = ptr;

        let dsqrt = T::sqrt(ldl.D[col]);
        L.rowval[ptr] = col;
        L.nzval[ptr] = dsqrt;
        ptr += 1;

        for idx in ldl.Lp[col]..ldl.Lp[col + 1] {
            L.rowval[ptr] = ldl.Li[idx];
            L.nzval[ptr] = ldl.Lx[idx] * dsqrt;
            ptr += 1;
        }
    }
    L.colptr[n] = ptr;

    L
}

//configure tests of internals
#[path = "test.rs"]
#[cfg(test)]
mod test;
