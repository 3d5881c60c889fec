#![allow(non_snake_case)]
use crate::algebra::{CscMatrix, FloatT};
use core::cmp::{max, min};
use std::iter::zip;

// Fill-reducing ordering of a symmetric sparsity pattern using approximate
// minimum degree.  `A` holds the upper triangle of the matrix; AMD works on
// the pattern only and ignores the values.  Returns the ordering and its
// inverse.
//
// The ordering stage must always terminate with some valid permutation, so
// if AMD rejects the pattern we fall back to the identity.
pub(crate) fn fill_reducing_ordering<T: FloatT>(
    A: &CscMatrix<T>,
    amd_dense_scale: f64,
) -> (Vec<usize>, Vec<usize>) {
    let mut control = amd::Control::default();
    control.dense *= amd_dense_scale;

    match amd::order(A.nrows(), &A.colptr, &A.rowval, &control) {
        Ok((perm, iperm, _info)) => (perm, iperm),
        Err(_) => {
            let perm: Vec<usize> = (0..A.nrows()).collect();
            let iperm = perm.clone();
            (perm, iperm)
        }
    }
}

// Construct an inverse permutation from a permutation
//
// # Panics
// Panics if `p` is not a bijection on 0..p.len()
pub(crate) fn invperm(p: &[usize]) -> Vec<usize> {
    const UNSET: usize = usize::MAX;
    let mut b = vec![UNSET; p.len()];

    for (i, j) in p.iter().enumerate() {
        assert!(*j < p.len() && b[*j] == UNSET, "not a valid permutation");
        b[*j] = i;
    }
    b
}

/// Applies the permutation `p` to `b`, writing `x[i] = b[p[i]]`.
///
/// Useful for applying the row permutation returned with a factor to
/// dense data, e.g. to form rows of `L[p,:]` when reconstructing the
/// input.  Requires no memory allocation.
pub fn permute<T: Copy>(x: &mut [T], b: &[T], p: &[usize]) {
    zip(p, x).for_each(|(p, x)| *x = b[*p]);
}

/// Applies the inverse of the permutation `p` to `b`, writing `x[p[i]] = b[i]`.
pub fn ipermute<T: Copy>(x: &mut [T], b: &[T], p: &[usize]) {
    zip(p, b).for_each(|(p, b)| x[*p] = *b);
}

// Given a sparse symmetric matrix `A` (upper triangular entries only),
// return the permuted sparse symmetric matrix `P` (also upper triangular)
// for the inverse permutation vector `iperm`.
//
// Entry (i,j) of `A` lands at (iperm[i], iperm[j]), folded back into the
// upper triangle.  Row indices within the permuted columns are not sorted.
// Following the book: Timothy Davis - Direct Methods for Sparse Linear Systems
pub(crate) fn permute_symmetric<T: FloatT>(A: &CscMatrix<T>, iperm: &[usize]) -> CscMatrix<T> {
    let n = A.ncols();
    let mut P = CscMatrix::<T>::spalloc(n, n, A.nnz());

    let Ar = &A.rowval;
    let Ac = &A.colptr;
    let Av = &A.nzval;

    // 1. count the number of entries that each column of P will have,
    // keeping in mind the row permutation
    let mut num_entries = vec![0; n];
    for colA in 0..n {
        let colP = iperm[colA];
        for rowA in Ar.iter().take(Ac[colA + 1]).skip(Ac[colA]) {
            let rowP = iperm[*rowA];
            if *rowA <= colA {
                // determine to which column the entry belongs after permutation
                let col_idx = max(rowP, colP);
                num_entries[col_idx] += 1;
            }
        }
    }

    // 2. calculate permuted P.colptr from the number of entries
    P.colptr[0] = 0;
    let mut acc = 0;
    for (Pckp1, ne) in zip(&mut P.colptr[1..], &num_entries) {
        *Pckp1 = acc + ne;
        acc = *Pckp1;
    }
    // reuse this memory to keep track of free entries in rowval
    num_entries.copy_from_slice(&P.colptr[0..n]);
    let mut row_starts = num_entries;

    // 3. permute the row entries and position of corresponding nzval
    for colA in 0..n {
        let colP = iperm[colA];
        for rowA_idx in Ac[colA]..Ac[colA + 1] {
            let rowA = Ar[rowA_idx];
            if rowA <= colA {
                let rowP = iperm[rowA];
                let col_idx = max(colP, rowP);

                // next free location in this column of rowval
                let rowP_idx = row_starts[col_idx];

                P.rowval[rowP_idx] = min(colP, rowP);
                P.nzval[rowP_idx] = Av[rowA_idx];

                row_starts[col_idx] += 1;
            }
        }
    }
    P
}
