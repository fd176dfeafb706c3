/// One Degree of Freedom slot on an Element
///
/// A slot is either a free unknown with a global index into the solution
/// vector, or fixed by a Dirichlet boundary condition and excluded from the
/// assembled system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dof {
    Free(usize),
    Fixed,
}

impl Dof {
    /// The global index of a free DoF, `None` for a constrained one
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Free(idx) => Some(*idx),
            Self::Fixed => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free(_))
    }
}

/// Boundary condition applied at one end of a Mesh
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BndrType {
    /// No condition; the vertex DoF is a free unknown
    Empty,
    /// The vertex value is prescribed; its DoF is removed from the system
    Dirichlet,
    /// Natural condition; the vertex DoF is a free unknown
    Neumann,
}

impl BndrType {
    pub fn constrains_vertex(&self) -> bool {
        matches!(self, Self::Dirichlet)
    }
}
