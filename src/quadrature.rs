use crate::basis::lobatto::MAX_P;
use crate::Fun1D;

use nalgebra::{DMatrix, SymmetricEigen};
use std::sync::OnceLock;

/// Quadrature order of the process-wide rule returned by [`rule`]
///
/// Chosen high enough to integrate products of two basis polynomials times a
/// smooth weight function exactly within quadrature tolerance.
pub const DEFAULT_NUM_POINTS: usize = 3 * (MAX_P - 1);

static RULE: OnceLock<GaussQuad> = OnceLock::new();

/// The shared fixed-order Gauss-Legendre rule used by assembly routines
pub fn rule() -> &'static GaussQuad {
    RULE.get_or_init(|| GaussQuad::with_num_points(DEFAULT_NUM_POINTS))
}

/// A Gauss-Legendre quadrature rule over the reference interval [-1, 1]
///
/// An `n`-point rule integrates polynomials up to degree `2n - 1` exactly.
/// Integrals over an arbitrary interval `[a, b]` are computed by an affine
/// change of variables.
pub struct GaussQuad {
    points: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussQuad {
    /// Construct an `n`-point rule via the Golub-Welsch algorithm: the nodes
    /// are the eigenvalues of the Jacobi matrix of the Legendre recurrence,
    /// and the weights follow from the first eigenvector components.
    pub fn with_num_points(n: usize) -> Self {
        assert!(n > 0, "Gauss-Legendre rule must have at least one point");

        let betas: Vec<f64> = (1..n)
            .map(|i| 0.5 / (1.0 - (2.0 * i as f64).powi(-2)).sqrt())
            .collect();

        let jacobi: DMatrix<f64> = DMatrix::from_fn(n, n, |r, c| {
            if r == c + 1 {
                betas[r - 1]
            } else if c == r + 1 {
                betas[c - 1]
            } else {
                0.0
            }
        });

        let eigen_decomp = SymmetricEigen::new(jacobi);

        let mut xw: Vec<(f64, f64)> = eigen_decomp
            .eigenvalues
            .iter()
            .cloned()
            .zip(
                eigen_decomp
                    .eigenvectors
                    .row(0)
                    .iter()
                    .map(|weight| (*weight).powi(2) * 2.0),
            )
            .collect();

        xw.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (points, weights): (Vec<_>, Vec<_>) = xw.drain(0..).unzip();

        Self { points, weights }
    }

    /// Number of quadrature points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `i`'th node on [-1, 1]
    pub fn point(&self, i: usize) -> f64 {
        self.points[i]
    }

    /// The `i`'th weight
    pub fn weight(&self, i: usize) -> f64 {
        self.weights[i]
    }

    /// Integrate `f` over `[a, b]`
    pub fn integrate(&self, f: &dyn Fun1D, a: f64, b: f64) -> f64 {
        // affine map from [-1, 1] to [a, b]
        let q = 0.5 * (a + b);
        let p = 0.5 * (b - a);

        let sum: f64 = self
            .points
            .iter()
            .zip(self.weights.iter())
            .map(|(x, w)| w * f.get(p * x + q))
            .sum();

        p * sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXACTNESS_TOL: f64 = 1e-10;

    #[test]
    fn five_point_rule_is_exact_to_degree_nine() {
        let quad = GaussQuad::with_num_points(5);

        // closed forms for monomials over [-1, 1]
        for deg in 0..=9usize {
            let exact = if deg % 2 == 0 {
                2.0 / (deg as f64 + 1.0)
            } else {
                0.0
            };
            let f = move |x: f64| x.powi(deg as i32);
            assert!(
                (quad.integrate(&f, -1.0, 1.0) - exact).abs() < EXACTNESS_TOL,
                "monomial of degree {} not integrated exactly",
                deg
            );
        }
    }

    #[test]
    fn sub_interval_integration() {
        let quad = GaussQuad::with_num_points(5);

        let f = |x: f64| 3.0 * x * x;
        assert!((quad.integrate(&f, 0.0, 2.0) - 8.0).abs() < EXACTNESS_TOL);

        let g = |x: f64| 2.0 * x + 1.0;
        assert!((quad.integrate(&g, 1.0, 4.0) - 18.0).abs() < EXACTNESS_TOL);
    }

    #[test]
    fn shared_rule_weights_sum_to_two() {
        let quad = rule();
        assert_eq!(quad.len(), DEFAULT_NUM_POINTS);

        let total: f64 = (0..quad.len()).map(|i| quad.weight(i)).sum();
        assert!((total - 2.0).abs() < EXACTNESS_TOL);

        for i in 0..quad.len() {
            assert!(quad.point(i).abs() < 1.0);
        }
    }
}
