/// Degrees of Freedom and boundary-condition types
pub mod dof;
/// A 1D Finite Element with its affine reference map
pub mod element;
/// An ordered collection of Elements partitioning a physical interval
pub mod mesh;
