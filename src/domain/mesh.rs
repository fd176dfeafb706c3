use super::dof::{BndrType, Dof};
use super::element::Element;
use crate::basis::lobatto::MAX_P;

/// An ordered collection of [`Element`]s partitioning a physical interval
///
/// Elements are kept sorted by increasing left endpoint, and consecutive
/// elements share an endpoint node exactly (no gaps, no overlaps). Global
/// DoF numbering, the free-DoF count and the matrix band-width all derive
/// from the mesh topology via [`Mesh::connect`], which must be re-run after
/// every refinement since splitting invalidates the numbering.
#[derive(Clone, Debug)]
pub struct Mesh {
    elems: Vec<Element>,
    nodes: Vec<f64>,
    dim: usize,
    band: usize,
}

impl Mesh {
    /// Build a mesh of `elem_count` uniform elements of degree `p` over `[a, b]`
    ///
    /// DoF slots are unnumbered until [`Mesh::connect`] is called.
    pub fn uniform(a: f64, b: f64, elem_count: usize, p: usize) -> Self {
        assert!(b > a, "degenerate mesh interval [{}, {}]", a, b);
        assert!(elem_count > 0, "mesh must contain at least one element");
        assert!(
            (1..MAX_P).contains(&p),
            "element degree {} outside supported range",
            p
        );

        let h = (b - a) / elem_count as f64;
        let nodes: Vec<f64> = (0..=elem_count)
            .map(|n| {
                if n == elem_count {
                    b // avoid accumulated rounding at the right end
                } else {
                    a + n as f64 * h
                }
            })
            .collect();

        let elems = nodes
            .windows(2)
            .map(|x| Element::new(x[0], x[1], p))
            .collect();

        Self {
            elems,
            nodes,
            dim: 0,
            band: 0,
        }
    }

    /// Assign global DoF numbers given the boundary-condition type at each end
    ///
    /// Numbering runs left to right: each element's left vertex, its bubble
    /// slots, then its right vertex, with shared vertices receiving a single
    /// shared index. A Dirichlet end marks the corresponding vertex slot as
    /// [`Dof::Fixed`] instead of allocating an index.
    pub fn connect(&mut self, left: BndrType, right: BndrType) {
        let mut next_id = 0;
        let mut alloc = |constrained: bool| -> Dof {
            if constrained {
                Dof::Fixed
            } else {
                let dof = Dof::Free(next_id);
                next_id += 1;
                dof
            }
        };

        let last = self.elems.len() - 1;
        let mut shared_vertex = alloc(left.constrains_vertex());

        for (n, elem) in self.elems.iter_mut().enumerate() {
            let p = elem.degree();

            elem.dofs[0] = shared_vertex;
            for slot in 1..p {
                elem.dofs[slot] = alloc(false);
            }
            elem.dofs[p] = alloc(n == last && right.constrains_vertex());

            shared_vertex = elem.dofs[p];
        }

        self.dim = next_id;
        self.band = self.calc_band();
    }

    // widest spread of free global indices coupled by a single element
    fn calc_band(&self) -> usize {
        self.elems
            .iter()
            .map(|elem| {
                let free: Vec<usize> = elem.dofs.iter().filter_map(|dof| dof.index()).collect();
                match (free.iter().min(), free.iter().max()) {
                    (Some(lo), Some(hi)) => hi - lo,
                    _ => 0,
                }
            })
            .max()
            .unwrap_or(0)
    }

    /// Number of free DoFs; the dimension of the assembled system
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of super-diagonals needed by the assembled band matrices
    pub fn band(&self) -> usize {
        self.band
    }

    pub fn elem_count(&self) -> usize {
        self.elems.len()
    }

    pub fn elem(&self, n: usize) -> &Element {
        &self.elems[n]
    }

    pub fn elems(&self) -> impl Iterator<Item = &Element> + '_ {
        self.elems.iter()
    }

    /// Number of mesh nodes (`elem_count + 1`)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, n: usize) -> f64 {
        self.nodes[n]
    }

    pub fn last_node(&self) -> f64 {
        *self.nodes.last().expect("mesh is never empty")
    }

    /// Whether `x` lies inside the covered interval (bounds inclusive)
    pub fn is_in_range(&self, x: f64) -> bool {
        self.nodes[0] <= x && x <= self.last_node()
    }

    /// Index of the element containing `x`
    ///
    /// Panics if `x` is outside the mesh range; callers are expected to
    /// check with [`Mesh::is_in_range`] first.
    pub fn find_elem(&self, x: f64) -> usize {
        assert!(self.is_in_range(x), "point {} outside mesh range", x);

        let idx = self.nodes.partition_point(|&node| node <= x);
        idx.saturating_sub(1).min(self.elems.len() - 1)
    }

    /// Bisect every element named in `ids`
    ///
    /// Each target element is replaced by two elements of the same degree
    /// exactly partitioning its interval. Global numbering is invalidated;
    /// [`Mesh::connect`] must be re-run before the mesh is used again.
    pub fn split_elems(&mut self, ids: &[usize]) {
        let mut targets = ids.to_vec();
        targets.sort_unstable();
        targets.dedup();

        // split back to front so earlier indices stay valid
        for &n in targets.iter().rev() {
            let (x0, x1, p) = {
                let elem = &self.elems[n];
                (elem.x0(), elem.x1(), elem.degree())
            };
            let xm = 0.5 * (x0 + x1);

            self.elems
                .splice(n..=n, [Element::new(x0, xm, p), Element::new(xm, x1, p)]);
        }

        self.nodes = self.elems.iter().map(|elem| elem.x0()).collect();
        self.nodes.push(self.last_elem_x1());
        self.dim = 0;
        self.band = 0;
    }

    fn last_elem_x1(&self) -> f64 {
        self.elems.last().expect("mesh is never empty").x1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_TOL: f64 = 1e-12;

    #[test]
    fn uniform_mesh_partitions_interval() {
        let mesh = Mesh::uniform(0.0, 2.0, 4, 3);

        assert_eq!(mesh.elem_count(), 4);
        assert_eq!(mesh.node_count(), 5);
        for (n, expected) in [0.0, 0.5, 1.0, 1.5, 2.0].iter().enumerate() {
            assert!((mesh.node(n) - expected).abs() < NODE_TOL);
        }

        // consecutive elements share an endpoint exactly
        for n in 0..mesh.elem_count() - 1 {
            assert_eq!(mesh.elem(n).x1(), mesh.elem(n + 1).x0());
        }
    }

    #[test]
    fn dirichlet_connectivity_numbering() {
        let mut mesh = Mesh::uniform(0.0, 1.0, 3, 4);
        mesh.connect(BndrType::Dirichlet, BndrType::Dirichlet);

        // (N + 1) vertices + N * (p - 1) bubbles - 2 constrained ends
        assert_eq!(mesh.dim(), 4 + 3 * 3 - 2);
        assert_eq!(mesh.band(), 4);

        assert_eq!(mesh.elem(0).dofs[0], Dof::Fixed);
        assert_eq!(mesh.elem(2).dofs[4], Dof::Fixed);

        // shared vertex carries one shared index
        assert_eq!(mesh.elem(0).dofs[4], mesh.elem(1).dofs[0]);
        assert_eq!(mesh.elem(1).dofs[4], mesh.elem(2).dofs[0]);

        // indices within an element are strictly increasing over free slots
        for elem in mesh.elems() {
            let free: Vec<usize> = elem.dofs.iter().filter_map(|d| d.index()).collect();
            assert!(free.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn neumann_end_keeps_vertex_free() {
        let mut mesh = Mesh::uniform(0.0, 1.0, 2, 2);
        mesh.connect(BndrType::Dirichlet, BndrType::Neumann);

        assert_eq!(mesh.elem(0).dofs[0], Dof::Fixed);
        assert!(mesh.elem(1).dofs[2].is_free());
        assert_eq!(mesh.dim(), 3 + 2 - 1);
    }

    #[test]
    fn find_elem_locates_points_and_bounds() {
        let mesh = Mesh::uniform(0.0, 1.0, 4, 2);

        assert_eq!(mesh.find_elem(0.0), 0);
        assert_eq!(mesh.find_elem(0.1), 0);
        assert_eq!(mesh.find_elem(0.25), 1);
        assert_eq!(mesh.find_elem(0.6), 2);
        assert_eq!(mesh.find_elem(1.0), 3);

        assert!(mesh.is_in_range(0.5));
        assert!(!mesh.is_in_range(-0.1));
        assert!(!mesh.is_in_range(1.1));
    }

    #[test]
    #[should_panic]
    fn find_elem_outside_range_panics() {
        Mesh::uniform(0.0, 1.0, 2, 2).find_elem(2.0);
    }

    #[test]
    fn split_bisects_exactly() {
        let mut mesh = Mesh::uniform(0.0, 2.0, 4, 3);
        let before = mesh.elem_count();
        let (x0, x1) = (mesh.elem(1).x0(), mesh.elem(1).x1());

        mesh.split_elems(&[1]);

        assert_eq!(mesh.elem_count(), before + 1);
        assert_eq!(mesh.elem(1).x0(), x0);
        assert_eq!(mesh.elem(1).x1(), mesh.elem(2).x0());
        assert_eq!(mesh.elem(2).x1(), x1);
        assert!((mesh.elem(1).x1() - 0.5 * (x0 + x1)).abs() < NODE_TOL);

        // degree is inherited
        assert_eq!(mesh.elem(1).degree(), 3);
        assert_eq!(mesh.elem(2).degree(), 3);
    }

    #[test]
    fn split_deduplicates_and_renumbers() {
        let mut mesh = Mesh::uniform(0.0, 1.0, 3, 2);
        mesh.connect(BndrType::Dirichlet, BndrType::Dirichlet);
        let dim_before = mesh.dim();

        mesh.split_elems(&[0, 2, 2]);
        mesh.connect(BndrType::Dirichlet, BndrType::Dirichlet);

        assert_eq!(mesh.elem_count(), 5);
        // each split adds one vertex and p - 1 bubbles
        assert_eq!(mesh.dim(), dim_before + 2 * 2);
    }
}
