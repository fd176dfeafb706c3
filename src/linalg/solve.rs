use super::band::SymBandMatrix;
use super::EigenSolution;

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use std::fmt;

// iteration cap handed to the symmetric eigendecomposition
const MAX_EIGEN_ITERATIONS: usize = 1000;

/// Error type for the banded solve and eigensolve kernels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinalgError {
    NotPositiveDefinite,
    EigenFailure,
}

impl fmt::Display for LinalgError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotPositiveDefinite => write!(
                f,
                "Matrix is not symmetric positive definite; Cannot factorize!"
            ),
            Self::EigenFailure => {
                write!(f, "Symmetric eigendecomposition failed to converge!")
            }
        }
    }
}

impl std::error::Error for LinalgError {}

/// Solve `A x = b` for a symmetric positive definite band matrix `A`
///
/// The band is expanded to a dense matrix and factored by Cholesky
/// decomposition; a failed factorization signals a non-SPD or singular
/// system. Problem dimensions here are tens of DoFs, so the dense kernel is
/// well within its comfort zone.
pub fn solve_sym_pos(a: &SymBandMatrix, b: &[f64]) -> Result<Vec<f64>, LinalgError> {
    assert_eq!(a.n(), b.len(), "right-hand side length must match matrix");

    let chol = Cholesky::new(a.to_dense()).ok_or(LinalgError::NotPositiveDefinite)?;
    let x = chol.solve(&DVector::from_column_slice(b));

    Ok(x.as_slice().to_vec())
}

/// The `eig_no` smallest eigenpairs of `A x = lambda x` for symmetric banded `A`
///
/// `abstol` is the absolute tolerance handed to the eigendecomposition.
pub fn eigen(
    a: &SymBandMatrix,
    eig_no: usize,
    abstol: f64,
) -> Result<EigenSolution, LinalgError> {
    smallest_eigenpairs(a.to_dense(), eig_no, abstol)
}

/// The `eig_no` smallest eigenpairs of the generalized problem
/// `A x = lambda B x`, with `B` symmetric banded positive definite
///
/// `B` is factored as `L L^T` and the problem reduced to the standard
/// symmetric eigenproblem `(L^-1 A L^-T) y = lambda y` with `x = L^-T y`.
/// Since the `y` are orthonormal, the returned eigenvectors satisfy
/// `x^T B x = 1`.
pub fn eigen_gen(
    a: &SymBandMatrix,
    b: &SymBandMatrix,
    eig_no: usize,
    abstol: f64,
) -> Result<EigenSolution, LinalgError> {
    assert_eq!(a.n(), b.n(), "A and B dimensions must match");

    let l = Cholesky::new(b.to_dense())
        .ok_or(LinalgError::NotPositiveDefinite)?
        .l();

    // C = L^-1 A L^-T, formed by two triangular solves
    let la = l
        .solve_lower_triangular(&a.to_dense())
        .ok_or(LinalgError::NotPositiveDefinite)?;
    let c = l
        .solve_lower_triangular(&la.transpose())
        .ok_or(LinalgError::NotPositiveDefinite)?;

    let reduced = smallest_eigenpairs(c, eig_no, abstol)?;

    // back-transform the eigenvectors: x = L^-T y
    let vectors = l
        .transpose()
        .solve_upper_triangular(&reduced.vectors)
        .ok_or(LinalgError::NotPositiveDefinite)?;

    Ok(EigenSolution::new(reduced.values, vectors))
}

fn smallest_eigenpairs(
    m: DMatrix<f64>,
    eig_no: usize,
    abstol: f64,
) -> Result<EigenSolution, LinalgError> {
    let n = m.nrows();
    assert!(
        (1..=n).contains(&eig_no),
        "requested {} eigenpairs from a {}-dimensional system",
        eig_no,
        n
    );

    let eps = abstol.max(f64::EPSILON);
    let decomp =
        SymmetricEigen::try_new(m, eps, MAX_EIGEN_ITERATIONS).ok_or(LinalgError::EigenFailure)?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| decomp.eigenvalues[i].total_cmp(&decomp.eigenvalues[j]));

    let values = order
        .iter()
        .take(eig_no)
        .map(|&i| decomp.eigenvalues[i])
        .collect();
    let vectors = DMatrix::from_fn(n, eig_no, |r, c| decomp.eigenvectors[(r, order[c])]);

    Ok(EigenSolution::new(values, vectors))
}
