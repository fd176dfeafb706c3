use crate::adaptive::{refine_to_tolerance, AdaptiveError, Refinable};
use crate::basis::lobatto;
use crate::domain::dof::BndrType;
use crate::domain::element::Element;
use crate::domain::mesh::Mesh;
use crate::linalg::{solve_sym_pos, LinalgError, SymBandMatrix};
use crate::quadrature;
use crate::Fun1D;

/// Solver for the radial Poisson-type boundary-value problem
///
/// Solves `-U''(r) = rho(r) / r` on `[0, rc]` with `U(0) = 0` and
/// `U(rc) = charge`. The boundary conditions are imposed by solving the
/// homogeneous problem and adding the linear correction afterwards, so the
/// assembled system is Dirichlet-zero at both ends. The physical potential
/// `V(r) = U(r) / r` is recovered by [`PoissonProb::v_h`].
pub struct PoissonProb<'a> {
    rho: &'a dyn Fun1D,
    mesh: Mesh,
    s: SymBandMatrix,
    b: Vec<f64>,
    y: Vec<f64>,
    rc: f64,
    charge: f64,
    // worst (indicator value, element id) from the last indicator pass
    worst: (f64, usize),
}

impl<'a> PoissonProb<'a> {
    /// Define the problem on a uniform mesh of `elem_count` elements of
    /// degree `degree` over `[0, rc]`
    pub fn new(rho: &'a dyn Fun1D, rc: f64, elem_count: usize, degree: usize, charge: f64) -> Self {
        let mut mesh = Mesh::uniform(0.0, rc, elem_count, degree);
        mesh.connect(BndrType::Dirichlet, BndrType::Dirichlet);

        Self {
            rho,
            mesh,
            s: SymBandMatrix::new(0, 0),
            b: Vec::new(),
            y: Vec::new(),
            rc,
            charge,
            worst: (0.0, 0),
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Solve on the current mesh without refinement
    pub fn solve(&mut self) -> Result<(), LinalgError> {
        self.malloc();
        self.assemble();
        self.y = solve_sym_pos(&self.s, &self.b)?;
        Ok(())
    }

    /// Solve, bisecting the worst-resolved element until every element's
    /// smallest bubble coefficient is below `coef_tol`
    pub fn solve_adaptive(
        &mut self,
        coef_tol: f64,
        max_iterations: usize,
    ) -> Result<usize, AdaptiveError<LinalgError>> {
        refine_to_tolerance(self, coef_tol, 0, max_iterations)
    }

    fn malloc(&mut self) {
        let dim = self.mesh.dim();
        self.s.assign(dim, self.mesh.band());
        self.b = vec![0.0; dim];
        self.y = vec![0.0; dim];
    }

    fn assemble(&mut self) {
        for elem in self.mesh.elems() {
            for i in 0..elem.dof_count() {
                let ni = match elem.dofs[i].index() {
                    Some(ni) => ni,
                    None => continue,
                };
                let psi_i = elem.psi_id(i);

                for j in i..elem.dof_count() {
                    // fixed slots carry zero Dirichlet values, so they
                    // contribute nothing to the right-hand side either
                    if let Some(nj) = elem.dofs[j].index() {
                        self.s.add(ni, nj, calc_s(elem, psi_i, elem.psi_id(j)));
                    }
                }

                self.b[ni] += calc_b(self.rho, elem, psi_i);
            }
        }
    }

    /// Per-element indicator: the smallest bubble coefficient in absolute
    /// value; the element where it is largest is the refinement target
    ///
    /// Elements without bubble functions contribute nothing.
    fn max_min_coef(&self) -> (f64, usize) {
        let mut worst = (0.0, 0);

        for (n, elem) in self.mesh.elems().enumerate() {
            let min_coef = (1..elem.dof_count() - 1)
                .filter_map(|j| elem.dofs[j].index())
                .map(|dof| self.y[dof].abs())
                .fold(f64::MAX, f64::min);

            if min_coef < f64::MAX && min_coef > worst.0 {
                worst = (min_coef, n);
            }
        }

        worst
    }

    /// Value of the homogeneous solution `u_h` at `r`
    ///
    /// Panics if `r` is outside the mesh or the problem is unsolved.
    pub fn u_h(&self, r: f64) -> f64 {
        assert!(self.mesh.is_in_range(r), "point {} outside the mesh", r);
        assert!(!self.y.is_empty(), "problem has not been solved yet");

        let elem = self.mesh.elem(self.mesh.find_elem(r));
        let s = elem.x_inv(r);

        (0..elem.dof_count())
            .filter_map(|i| {
                elem.dofs[i]
                    .index()
                    .map(|m| self.y[m] * lobatto::eval(elem.psi_id(i), s))
            })
            .sum()
    }

    /// Value of the physical potential `V(r) = U(r) / r` at `r > 0`
    ///
    /// Adds the linear correction restoring the non-homogeneous boundary
    /// values `U(0) = 0`, `U(rc) = charge` before dividing by `r`.
    pub fn v_h(&self, r: f64) -> f64 {
        assert!(r > 0.0, "potential is singular at r = 0");

        let (ua, ub) = (0.0, self.charge);
        let alpha = (ub - ua) / self.rc;
        let beta = ua;

        (self.u_h(r) + alpha * r + beta) / r
    }
}

impl Refinable for PoissonProb<'_> {
    type Error = LinalgError;

    fn error_indicator(&mut self) -> Result<f64, LinalgError> {
        self.solve()?;
        self.worst = self.max_min_coef();
        Ok(self.worst.0)
    }

    fn refine(&mut self) -> Result<(), LinalgError> {
        self.mesh.split_elems(&[self.worst.1]);
        self.mesh.connect(BndrType::Dirichlet, BndrType::Dirichlet);
        Ok(())
    }
}

/// Stiffness matrix entry for shape functions `ni`, `nj` on element `e`
fn calc_s(e: &Element, ni: usize, nj: usize) -> f64 {
    lobatto::tables().s(ni, nj) / e.jac()
}

/// Load vector entry `int psi_ni(s) * rho(r(s)) / r(s)` over element `e`
///
/// Quadrature nodes are strictly interior, so `r > 0` even on the element
/// touching the origin.
fn calc_b(rho: &dyn Fun1D, e: &Element, ni: usize) -> f64 {
    let quad = quadrature::rule();
    let sum: f64 = (0..quad.len())
        .map(|n| {
            let s = quad.point(n);
            let r = e.x(s);
            quad.weight(n) * lobatto::eval(ni, s) * rho.get(r) / r
        })
        .sum();

    e.jac() * sum
}
