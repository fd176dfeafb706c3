/// Adaptive piecewise-polynomial function approximation
pub mod approx;
/// Generalized eigenproblem solver for radial Sturm-Liouville operators
pub mod eigen;
/// Poisson-type boundary-value solver on a radial domain
pub mod poisson;
