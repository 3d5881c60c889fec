#![allow(non_snake_case)]

use sparsechol::algebra::CscMatrix;
use sparsechol::cholesky::{
    sparse_cholesky, CholeskyError, CholeskySettingsBuilder, SparseCholesky,
};

fn to_dense(A: &CscMatrix<f64>) -> Vec<Vec<f64>> {
    let mut M = vec![vec![0.0; A.ncols()]; A.nrows()];
    for col in 0..A.ncols() {
        for idx in A.colptr[col]..A.colptr[col + 1] {
            M[A.rowval[idx]][col] = A.nzval[idx];
        }
    }
    M
}

// G = (L[p,:]) * (L[p,:])'
fn gram_permuted(chol: &SparseCholesky<f64>) -> Vec<Vec<f64>> {
    let Ld = to_dense(&chol.L);
    let p = &chol.perm;
    let n = p.len();

    let mut G = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            G[i][j] = (0..n).map(|k| Ld[p[i]][k] * Ld[p[j]][k]).sum();
        }
    }
    G
}

// factor is lower triangular with strictly positive diagonal, and the
// permutation is a bijection
fn check_factor(chol: &SparseCholesky<f64>) {
    assert!(chol.L.is_tril());
    for j in 0..chol.L.ncols() {
        assert!(chol.L.get_entry((j, j)).unwrap() > 0.0);
    }

    let mut sorted = chol.perm.clone();
    sorted.sort_unstable();
    let expected: Vec<usize> = (0..chol.perm.len()).collect();
    assert_eq!(sorted, expected);
}

// reconstruction identity against A + eps*I
fn check_gram(chol: &SparseCholesky<f64>, A: &CscMatrix<f64>, eps: f64) {
    let G = gram_permuted(chol);
    let Ad = to_dense(A);
    let n = A.ncols();

    for i in 0..n {
        for j in 0..n {
            let target = Ad[i][j] + if i == j { eps } else { 0.0 };
            assert!(
                (G[i][j] - target).abs() <= 1e-8,
                "mismatch at ({},{}) : {} vs {}",
                i,
                j,
                G[i][j],
                target
            );
        }
    }
}

#[test]
fn test_diagonal() {
    let A = CscMatrix::from(&[
        [4.0, 0.0, 0.0, 0.0],
        [0.0, 9.0, 0.0, 0.0],
        [0.0, 0.0, 16.0, 0.0],
        [0.0, 0.0, 0.0, 25.0],
    ]);

    let chol = sparse_cholesky(&A, 0.0).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, 0.0);

    //the factor of a diagonal matrix is the diagonal of square roots,
    //up to permutation
    let mut diag: Vec<f64> = (0..4)
        .map(|j| chol.L.get_entry((j, j)).unwrap())
        .collect();
    diag.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for (d, root) in diag.iter().zip([2.0, 3.0, 4.0, 5.0]) {
        assert!((d - root).abs() <= 1e-12);
    }
    assert_eq!(chol.L.nnz(), 4);
}

#[test]
fn test_tridiagonal() {
    // diagonally dominant, so positive definite
    let A = CscMatrix::from(&[
        [2.0, -1.0, 0.0, 0.0, 0.0],
        [-1.0, 2.0, -1.0, 0.0, 0.0],
        [0.0, -1.0, 2.0, -1.0, 0.0],
        [0.0, 0.0, -1.0, 2.0, -1.0],
        [0.0, 0.0, 0.0, -1.0, 2.0],
    ]);

    let chol = sparse_cholesky(&A, 0.0).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, 0.0);
}

#[test]
fn test_generic_psd() {
    // A = B*B' for an invertible B, so positive definite
    // B = [2 1 0; 1 3 1; 0 1 2]
    let A = CscMatrix::from(&[
        //
        [5.0, 5.0, 1.0],
        [5.0, 11.0, 5.0],
        [1.0, 5.0, 5.0],
    ]);

    let chol = sparse_cholesky(&A, 0.0).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, 0.0);
}

#[test]
fn test_rank_deficient_gram_is_singular() {
    // A = B*B' with B of size 4 x 2, so A is PSD with rank 2
    // B = [1 0; 0 1; 1 1; 1 -1]
    let A = CscMatrix::from(&[
        [1.0, 0.0, 1.0, 1.0],
        [0.0, 1.0, 1.0, -1.0],
        [1.0, 1.0, 2.0, 0.0],
        [1.0, -1.0, 0.0, 2.0],
    ]);

    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::SingularMatrix
    );

    //a large enough shift rescues singularity
    let eps = 0.5;
    let chol = sparse_cholesky(&A, eps).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, eps);
}

#[test]
fn test_zero_diagonal_entry_is_singular() {
    let A = CscMatrix::from(&[
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 2.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 3.0],
    ]);

    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::SingularMatrix
    );

    let chol = sparse_cholesky(&A, 1.0).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, 1.0);
}

#[test]
fn test_missing_structural_diagonal() {
    //row and column 0 are entirely zero, with no stored entries at all
    let A = CscMatrix::from(&[
        //
        [0.0, 0.0],
        [0.0, 2.0],
    ]);

    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::SingularMatrix
    );

    //the shift must land on the missing diagonal entry as well
    let chol = sparse_cholesky(&A, 1.0).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, 1.0);
}

#[test]
fn test_indefinite_diagonal() {
    let A = CscMatrix::from(&[
        //
        [1.0, 0.0, 0.0],
        [0.0, -2.0, 0.0],
        [0.0, 0.0, 3.0],
    ]);

    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::IndefiniteMatrix
    );

    //regularization only rescues singularity, not negative curvature
    assert_eq!(
        sparse_cholesky(&A, 1.0).unwrap_err(),
        CholeskyError::IndefiniteMatrix
    );
}

#[test]
fn test_indefinite_tridiagonal() {
    //one negative diagonal entry dominating its row
    let A = CscMatrix::from(&[
        [1.0, 0.25, 0.0, 0.0, 0.0],
        [0.25, 1.2, 0.25, 0.0, 0.0],
        [0.0, 0.25, 1.5, 0.25, 0.0],
        [0.0, 0.0, 0.25, 1.1, 0.25],
        [0.0, 0.0, 0.0, 0.25, -1.0],
    ]);

    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::IndefiniteMatrix
    );
    assert_eq!(
        sparse_cholesky(&A, 0.25).unwrap_err(),
        CholeskyError::IndefiniteMatrix
    );
}

#[test]
fn test_indefinite_dense() {
    //fully dense symmetric matrix with det = -11, so an odd number of
    //negative eigenvalues
    let A = CscMatrix::from(&[
        //
        [2.0, 3.0, 1.0],
        [3.0, 1.0, 2.0],
        [1.0, 2.0, 2.0],
    ]);

    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::IndefiniteMatrix
    );

    //the shifted matrix still has det < 0
    assert_eq!(
        sparse_cholesky(&A, 1.0).unwrap_err(),
        CholeskyError::IndefiniteMatrix
    );
}

#[test]
fn test_ordering_invariance() {
    let A = CscMatrix::from(&[
        //
        [5.0, 5.0, 1.0],
        [5.0, 11.0, 5.0],
        [1.0, 5.0, 5.0],
    ]);

    //default AMD ordering
    let chol = sparse_cholesky(&A, 0.0).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, 0.0);

    //identity ordering
    let opts = CholeskySettingsBuilder::default()
        .perm(vec![0, 1, 2])
        .build()
        .unwrap();
    let chol = SparseCholesky::new(&A, 0.0, Some(opts)).unwrap();
    assert_eq!(chol.perm, vec![0, 1, 2]);
    check_factor(&chol);
    check_gram(&chol, &A, 0.0);

    //an arbitrary valid ordering
    let opts = CholeskySettingsBuilder::default()
        .perm(vec![2, 0, 1])
        .build()
        .unwrap();
    let chol = SparseCholesky::new(&A, 0.0, Some(opts)).unwrap();
    check_factor(&chol);
    check_gram(&chol, &A, 0.0);
}

#[test]
fn test_scalar_matrix() {
    let A: CscMatrix<f64> = CscMatrix::from(&[[4.0]]);
    let chol = sparse_cholesky(&A, 0.0).unwrap();
    assert_eq!(chol.perm, vec![0]);
    assert!((chol.L.get_entry((0, 0)).unwrap() - 2.0).abs() <= 1e-12);

    let A: CscMatrix<f64> = CscMatrix::from(&[[0.0]]);
    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::SingularMatrix
    );

    let chol = sparse_cholesky(&A, 1.0).unwrap();
    assert!((chol.L.get_entry((0, 0)).unwrap() - 1.0).abs() <= 1e-12);

    let A: CscMatrix<f64> = CscMatrix::from(&[[-1.0]]);
    assert_eq!(
        sparse_cholesky(&A, 0.0).unwrap_err(),
        CholeskyError::IndefiniteMatrix
    );
}

#[test]
fn test_input_not_modified() {
    let A = CscMatrix::from(&[
        //
        [2.0, 1.0],
        [1.0, 2.0],
    ]);
    let A0 = A.clone();

    let _chol = sparse_cholesky(&A, 0.0).unwrap();
    assert_eq!(A, A0);

    let _chol = sparse_cholesky(&A, 0.5).unwrap();
    assert_eq!(A, A0);
}

#[test]
#[should_panic]
fn test_negative_eps_panics() {
    let A = CscMatrix::from(&[[4.0]]);
    let _ = sparse_cholesky(&A, -1.0);
}

#[test]
#[should_panic]
fn test_non_square_panics() {
    // 2 x 3 matrix
    let A = CscMatrix::from(&[
        //
        [1.0, 2.0, 3.0],
        [4.0, 5.0, 6.0],
    ]);
    let _ = sparse_cholesky(&A, 0.0);
}
