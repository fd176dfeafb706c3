use crate::adaptive::{refine_to_tolerance, AdaptiveError, Refinable};
use crate::basis::lobatto;
use crate::domain::dof::BndrType;
use crate::domain::element::Element;
use crate::domain::mesh::Mesh;
use crate::linalg::{eigen_gen, EigenSolution, LinalgError, SymBandMatrix};
use crate::quadrature;
use crate::Fun1D;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

// kinetic-term prefactor of the radial Schroedinger operator
const GAMMA: f64 = 0.5;

/// Solver for the radial Sturm-Liouville generalized eigenproblem
///
/// Finds the smallest eigenpairs of
///
/// `-gamma u''(r) + [g(r) + ell (ell + 1) / (2 r^2)] u(r) = lambda u(r)`
///
/// on `[0, rc]` with `u(0) = u(rc) = 0`, discretized as the generalized
/// problem `S x = lambda O x` with `S` the stiffness and `O` the overlap
/// matrix. Eigenvectors come back `O`-normalized, so the eigenfunctions
/// integrate to one in the `L2` sense.
pub struct EigProb<'a> {
    g: &'a dyn Fun1D,
    ell: usize,
    mesh: Mesh,
    s: SymBandMatrix,
    o: SymBandMatrix,
    solution: Option<EigenSolution>,
    // adaptive state: requested eigenpair count and tolerance, plus the
    // elements marked for bisection by the last indicator pass
    eig_no: usize,
    abstol: f64,
    marks: Vec<usize>,
}

impl<'a> EigProb<'a> {
    /// Define the problem on a uniform mesh of `elem_count` elements of
    /// degree `degree` over `[0, rc]`
    ///
    /// `g` is the radial potential without the centrifugal term; `ell` is
    /// the angular momentum quantum number.
    pub fn new(g: &'a dyn Fun1D, ell: usize, rc: f64, elem_count: usize, degree: usize) -> Self {
        let mut mesh = Mesh::uniform(0.0, rc, elem_count, degree);
        mesh.connect(BndrType::Dirichlet, BndrType::Dirichlet);

        Self {
            g,
            ell,
            mesh,
            s: SymBandMatrix::new(0, 0),
            o: SymBandMatrix::new(0, 0),
            solution: None,
            eig_no: 0,
            abstol: 0.0,
            marks: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Solve for the `eig_no` smallest eigenpairs on the current mesh
    pub fn solve(&mut self, eig_no: usize, abstol: f64) -> Result<(), LinalgError> {
        self.eig_no = eig_no;
        self.abstol = abstol;

        self.malloc();
        self.assemble();
        self.solution = Some(eigen_gen(&self.s, &self.o, eig_no, abstol)?);
        Ok(())
    }

    /// Solve adaptively: every eigenfunction nominates its worst-resolved
    /// element and the union of nominations is bisected, until the largest
    /// indicator over all requested states drops below `coef_tol`
    pub fn solve_adaptive(
        &mut self,
        eig_no: usize,
        abstol: f64,
        coef_tol: f64,
        max_iterations: usize,
    ) -> Result<usize, AdaptiveError<LinalgError>> {
        self.eig_no = eig_no;
        self.abstol = abstol;

        refine_to_tolerance(self, coef_tol, 0, max_iterations)
    }

    fn malloc(&mut self) {
        let dim = self.mesh.dim();
        let band = self.mesh.band();
        self.s.assign(dim, band);
        self.o.assign(dim, band);
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
                    if let Some(nj) = elem.dofs[j].index() {
                        let psi_j = elem.psi_id(j);
                        let s_entry = self.calc_s(elem, psi_i, psi_j);
                        self.s.add(ni, nj, s_entry);
                        self.o.add(ni, nj, calc_k(elem, psi_i, psi_j));
                    }
                }
            }
        }
    }

    /// Stiffness entry: the analytic derivative term plus the quadrature of
    /// the potential term
    fn calc_s(&self, e: &Element, ni: usize, nj: usize) -> f64 {
        let v1 = GAMMA * lobatto::tables().s(ni, nj);

        let quad = quadrature::rule();
        let v0: f64 = (0..quad.len())
            .map(|n| {
                let s = quad.point(n);
                let r = e.x(s);
                quad.weight(n) * lobatto::eval(ni, s) * lobatto::eval(nj, s) * self.pot(r)
            })
            .sum();

        v1 / e.jac() + v0 * e.jac()
    }

    /// Effective potential `g(r) + ell (ell + 1) / (2 r^2)`
    fn pot(&self, r: f64) -> f64 {
        assert!(r > 0.0, "effective potential is singular at r = 0");
        self.g.get(r) + (self.ell * (self.ell + 1)) as f64 / (2.0 * r * r)
    }

    /// Per-state indicator over all elements, refreshing the marked-element
    /// union; returns the largest indicator over the requested states
    ///
    /// Each state nominates the element maximizing its smallest bubble
    /// coefficient in absolute value. Elements without bubbles are skipped.
    fn max_min_coefs(&mut self) -> f64 {
        let solution = self
            .solution
            .as_ref()
            .expect("indicator requires a solved problem");

        self.marks.clear();
        let mut worst = 0.0;

        for state in 0..self.eig_no {
            let mut state_worst = (0.0, 0);

            for (n, elem) in self.mesh.elems().enumerate() {
                let min_coef = (1..elem.dof_count() - 1)
                    .filter_map(|j| elem.dofs[j].index())
                    .map(|dof| solution.vector(state, dof).abs())
                    .fold(f64::MAX, f64::min);

                if min_coef < f64::MAX && min_coef > state_worst.0 {
                    state_worst = (min_coef, n);
                }
            }

            if state_worst.0 > 0.0 {
                self.marks.push(state_worst.1);
            }
            if state_worst.0 > worst {
                worst = state_worst.0;
            }
        }

        self.marks.sort_unstable();
        self.marks.dedup();

        worst
    }

    /// The `eig`'th smallest eigenvalue
    ///
    /// Panics if the problem is unsolved or `eig` is out of bounds.
    pub fn eig_val(&self, eig: usize) -> f64 {
        self.solution
            .as_ref()
            .expect("problem has not been solved yet")
            .value(eig)
    }

    /// Value of the `eig`'th eigenfunction at `r`
    ///
    /// Panics if the problem is unsolved, `eig` is out of bounds, or `r` is
    /// outside the mesh.
    pub fn eig_fun(&self, eig: usize, r: f64) -> f64 {
        let solution = self
            .solution
            .as_ref()
            .expect("problem has not been solved yet");
        assert!(eig < solution.len(), "eigenpair index {} out of bounds", eig);
        assert!(self.mesh.is_in_range(r), "point {} outside the mesh", r);

        let elem = self.mesh.elem(self.mesh.find_elem(r));
        let s = elem.x_inv(r);

        (0..elem.dof_count())
            .filter_map(|i| {
                elem.dofs[i]
                    .index()
                    .map(|mi| solution.vector(eig, mi) * lobatto::eval(elem.psi_id(i), s))
            })
            .sum()
    }

    /// Write the `eig`'th eigenfunction to a gnuplot-friendly text file,
    /// sampling `point_no` points per element plus the final mesh node
    pub fn write_eig_fun(&self, path: &Path, eig: usize, point_no: usize) -> io::Result<()> {
        assert!(point_no > 0, "at least one sample per element is required");

        let mut out = BufWriter::new(File::create(path)?);

        writeln!(out, "#")?;
        writeln!(out, "# Eigenfunction for one electronic state.")?;
        writeln!(out, "# First column: radius r in bohr units.")?;
        writeln!(out, "# Second column: eigenfunction value.")?;
        writeln!(out, "#")?;

        for n in 0..self.mesh.node_count() - 1 {
            let x0 = self.mesh.node(n);
            let dx = (self.mesh.node(n + 1) - x0) / point_no as f64;
            for i in 0..point_no {
                let x = x0 + i as f64 * dx;
                writeln!(out, "{:E} {:E}", x, self.eig_fun(eig, x))?;
            }
        }

        // written separately to dodge accumulated rounding
        let x = self.mesh.last_node();
        writeln!(out, "{:E} {:E}", x, self.eig_fun(eig, x))?;

        Ok(())
    }
}

impl Refinable for EigProb<'_> {
    type Error = LinalgError;

    fn error_indicator(&mut self) -> Result<f64, LinalgError> {
        self.malloc();
        self.assemble();
        self.solution = Some(eigen_gen(&self.s, &self.o, self.eig_no, self.abstol)?);

        Ok(self.max_min_coefs())
    }

    fn refine(&mut self) -> Result<(), LinalgError> {
        self.mesh.split_elems(&self.marks);
        self.mesh.connect(BndrType::Dirichlet, BndrType::Dirichlet);
        Ok(())
    }
}

/// Overlap matrix entry from the analytic mass table
fn calc_k(e: &Element, ni: usize, nj: usize) -> f64 {
    e.jac() * lobatto::tables().k(ni, nj)
}
