//! A 1D h-Adaptive Finite Element Method Toolkit
//!
//! Solves one-dimensional boundary-value and eigenvalue problems on radial
//! domains using hierarchical (Lobatto) polynomial basis functions over an
//! adaptively refined mesh. Three solvers are built on the shared engine:
//!
//! * [`ApproxSolver`]: fits a scalar function with a continuous piecewise
//!   polynomial expansion to a prescribed local error
//! * [`PoissonProb`]: solves a Poisson-type linear boundary-value problem
//!   with Dirichlet ends
//! * [`EigProb`]: solves a Sturm-Liouville-type generalized eigenproblem
//!   for the smallest few eigenpairs
//!
//! All three share the same adaptive pattern: an error indicator selects the
//! worst-resolved piece of the discretization, which is bisected, and the
//! problem is re-solved until the indicator falls below tolerance.

/// Shared adaptive-refinement machinery (error heap and refinement driver)
pub mod adaptive;
/// Hierarchical polynomial basis functions
pub mod basis;
/// The geometric structure of a 1D problem domain
pub mod domain;
/// Banded symmetric matrices and the solvers operating on them
pub mod linalg;
/// Solvers for approximation, boundary-value, and eigenvalue problems
pub mod problem;
/// Gauss-Legendre quadrature over arbitrary sub-intervals
pub mod quadrature;

pub use adaptive::{AdaptiveError, Refinable};
pub use domain::mesh::Mesh;
pub use linalg::EigenSolution;
pub use problem::approx::{Approx, ApproxSolver};
pub use problem::eigen::EigProb;
pub use problem::poisson::PoissonProb;

/// A real-valued function of one real variable
///
/// This is the capability consumed by quadrature, approximation, and matrix
/// assembly. It must be defined for every `x` in the relevant problem domain.
pub trait Fun1D {
    fn get(&self, x: f64) -> f64;
}

impl<F> Fun1D for F
where
    F: Fn(f64) -> f64,
{
    fn get(&self, x: f64) -> f64 {
        self(x)
    }
}
