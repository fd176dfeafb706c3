use super::dof::Dof;
use crate::basis::lobatto::MAX_P;

use smallvec::{smallvec, SmallVec};

/// One 1D finite element over a physical sub-interval `[x0, x1]`
///
/// The element owns the affine map between its physical interval and the
/// reference interval [-1, 1], and one DoF slot per supported shape function.
/// Slots are populated by [`Mesh::connect`](super::mesh::Mesh::connect); an
/// element fresh out of [`Element::new`] has all slots `Fixed`.
#[derive(Clone, Debug)]
pub struct Element {
    /// Global DoF slots, one per shape function with support on this element
    pub dofs: SmallVec<[Dof; MAX_P]>,
    // midpoint: (x0 + x1) / 2
    c1: f64,
    // jacobian: (x1 - x0) / 2
    c2: f64,
}

impl Element {
    /// Define an element over `[x0, x1]` of polynomial degree `p`
    ///
    /// Panics unless `x1 > x0` and `1 <= p < MAX_P`.
    pub fn new(x0: f64, x1: f64, p: usize) -> Self {
        assert!(x1 > x0, "degenerate element [{}, {}]", x0, x1);
        assert!(
            (1..MAX_P).contains(&p),
            "element degree {} outside supported range",
            p
        );

        Self {
            dofs: smallvec![Dof::Fixed; p + 1],
            c1: (x1 + x0) / 2.0,
            c2: (x1 - x0) / 2.0,
        }
    }

    /// Map a reference coordinate `s` to physical space
    pub fn x(&self, s: f64) -> f64 {
        self.c1 + s * self.c2
    }

    /// Map a physical coordinate `x` back to the reference interval
    ///
    /// The result is clamped to [-1, 1]: evaluation exactly at element
    /// boundaries is common and floating-point rounding would otherwise push
    /// the coordinate just outside the basis functions' domain.
    pub fn x_inv(&self, x: f64) -> f64 {
        let s = (x - self.c1) / self.c2;
        s.clamp(-1.0, 1.0)
    }

    /// The scalar Jacobian `(x1 - x0) / 2` of the reference map, always > 0
    pub fn jac(&self) -> f64 {
        self.c2
    }

    /// Left end of the physical interval
    pub fn x0(&self) -> f64 {
        self.c1 - self.c2
    }

    /// Right end of the physical interval
    pub fn x1(&self) -> f64 {
        self.c1 + self.c2
    }

    /// Polynomial degree
    pub fn degree(&self) -> usize {
        self.dofs.len() - 1
    }

    /// Number of DoF slots (`degree + 1`)
    pub fn dof_count(&self) -> usize {
        self.dofs.len()
    }

    /// Map a local DoF slot to its shape-function index
    ///
    /// The two vertex functions always occupy the ends of the slot array
    /// regardless of element degree: slot 0 holds `psi_0`, the last slot
    /// holds `psi_1`, and interior slot `i` holds bubble `psi_{i+1}`.
    pub fn psi_id(&self, i: usize) -> usize {
        assert!(i < self.dofs.len(), "DoF slot {} out of range", i);

        if i == 0 {
            0
        } else if i == self.dofs.len() - 1 {
            1
        } else {
            i + 1
        }
    }
}
