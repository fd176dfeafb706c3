/// Symmetric band matrix with packed upper-triangle storage
pub mod band;
/// Dense solvers backing the banded systems and eigenproblems
pub mod solve;

pub use band::SymBandMatrix;
pub use solve::{eigen, eigen_gen, solve_sym_pos, LinalgError};

use nalgebra::DMatrix;

/// Solution of a (generalized) symmetric eigenproblem
///
/// Holds the requested smallest eigenvalues in ascending order and the
/// matching eigenvectors as matrix columns. Consumed read-only by callers.
pub struct EigenSolution {
    values: Vec<f64>,
    vectors: DMatrix<f64>,
}

impl EigenSolution {
    pub(crate) fn new(values: Vec<f64>, vectors: DMatrix<f64>) -> Self {
        assert_eq!(values.len(), vectors.ncols());
        Self { values, vectors }
    }

    /// Number of eigenpairs held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The `i`'th smallest eigenvalue
    ///
    /// Panics if `i` is out of bounds.
    pub fn value(&self, i: usize) -> f64 {
        assert!(i < self.values.len(), "eigenvalue index {} out of bounds", i);
        self.values[i]
    }

    /// Component `row` of the `i`'th eigenvector
    pub fn vector(&self, i: usize, row: usize) -> f64 {
        assert!(i < self.values.len(), "eigenvector index {} out of bounds", i);
        self.vectors[(row, i)]
    }
}
