//! Lobatto hierarchical shape functions on the reference interval [-1, 1]
//!
//! The first two functions interpolate the interval endpoints:
//!
//! ```text
//! psi_0(-1) = 1, psi_0(+1) = 0
//! psi_1(-1) = 0, psi_1(+1) = 1
//! ```
//!
//! All higher ("bubble") functions vanish at both endpoints, which allows
//! Dirichlet boundary conditions to be enforced directly on the two vertex
//! coefficients. The bubble functions are integrated normalized Legendre
//! polynomials, so their derivatives are mutually orthonormal.
//!
//! The pairwise inner products (mass matrix `K`) and derivative inner
//! products (stiffness matrix `S`) have closed forms up to degree 10. They
//! are tabulated once per process by [`tables`], bypassing numerical
//! integration error for the two most frequently evaluated inner products.

use std::sync::OnceLock;

/// Number of shape functions; the maximal element degree is `MAX_P - 1`
pub const MAX_P: usize = 11;

static TABLES: OnceLock<LobattoTables> = OnceLock::new();

/// The shared inner-product tables, built on first use
pub fn tables() -> &'static LobattoTables {
    TABLES.get_or_init(LobattoTables::new)
}

/// Evaluate shape function `i` at `s` on the reference interval
///
/// Panics if `i >= MAX_P` or `s` lies outside [-1, 1].
pub fn eval(i: usize, s: f64) -> f64 {
    assert!(i < MAX_P, "shape function index {} out of range", i);
    assert!(
        (-1.0..=1.0).contains(&s),
        "reference coordinate {} outside [-1, 1]",
        s
    );

    let s2 = s * s;
    match i {
        0 => 0.5 * (1.0 - s),
        1 => 0.5 * (1.0 + s),
        2 => (3.0f64 / 2.0).sqrt() / 2.0 * (s2 - 1.0),
        3 => (5.0f64 / 2.0).sqrt() / 2.0 * (s2 - 1.0) * s,
        4 => (7.0f64 / 2.0).sqrt() / 8.0 * (s2 - 1.0) * (5.0 * s2 - 1.0),
        5 => (9.0f64 / 2.0).sqrt() / 8.0 * (s2 - 1.0) * (7.0 * s2 - 3.0) * s,
        6 => {
            (11.0f64 / 2.0).sqrt() / 16.0 * (s2 - 1.0) * (21.0 * s2 * s2 - 14.0 * s2 + 1.0)
        }
        7 => {
            (13.0f64 / 2.0).sqrt() / 16.0 * (s2 - 1.0) * (33.0 * s2 * s2 - 30.0 * s2 + 5.0) * s
        }
        8 => {
            (15.0f64 / 2.0).sqrt() / 128.0
                * (s2 - 1.0)
                * (429.0 * s2 * s2 * s2 - 495.0 * s2 * s2 + 135.0 * s2 - 5.0)
        }
        9 => {
            (17.0f64 / 2.0).sqrt() / 128.0
                * (s2 - 1.0)
                * (715.0 * s2 * s2 * s2 - 1001.0 * s2 * s2 + 385.0 * s2 - 35.0)
                * s
        }
        10 => {
            let s4 = s2 * s2;
            let s6 = s4 * s2;
            let s8 = s6 * s2;
            (19.0f64 / 2.0).sqrt() / 256.0
                * (s2 - 1.0)
                * (2431.0 * s8 - 4004.0 * s6 + 2002.0 * s4 - 308.0 * s2 + 7.0)
        }
        _ => unreachable!(),
    }
}

/// Precomputed inner products of the Lobatto shape functions
///
/// `K[i][j] = \int_{-1}^{1} psi_i(s) psi_j(s) ds`
///
/// `S[i][j] = \int_{-1}^{1} psi_i'(s) psi_j'(s) ds`
///
/// Both tables are symmetric and fixed for the lifetime of the process. The
/// entries are the closed forms, not quadrature results.
pub struct LobattoTables {
    k: [[f64; MAX_P]; MAX_P],
    s: [[f64; MAX_P]; MAX_P],
}

impl LobattoTables {
    pub fn new() -> Self {
        Self {
            k: Self::calc_k(),
            s: Self::calc_s(),
        }
    }

    /// Mass-matrix entry `K[i][j]`
    pub fn k(&self, i: usize, j: usize) -> f64 {
        assert!(i < MAX_P && j < MAX_P, "mass table index out of range");
        self.k[i][j]
    }

    /// Stiffness-matrix entry `S[i][j]`
    pub fn s(&self, i: usize, j: usize) -> f64 {
        assert!(i < MAX_P && j < MAX_P, "stiffness table index out of range");
        self.s[i][j]
    }

    fn calc_s() -> [[f64; MAX_P]; MAX_P] {
        let mut s = [[0.0; MAX_P]; MAX_P];

        s[0][0] = 0.5;
        s[1][1] = 0.5;
        s[0][1] = -0.5;
        s[1][0] = -0.5;

        // bubble derivatives are orthonormal
        for (i, row) in s.iter_mut().enumerate().skip(2) {
            row[i] = 1.0;
        }

        s
    }

    fn calc_k() -> [[f64; MAX_P]; MAX_P] {
        let mut k = [[0.0; MAX_P]; MAX_P];

        k[0][0] = 2.0 / 3.0;
        k[0][1] = 1.0 / 3.0;
        k[0][2] = -1.0 / 6.0f64.sqrt();
        k[0][3] = 1.0 / (3.0 * 10.0f64.sqrt());

        k[1][1] = 2.0 / 3.0;
        k[1][2] = -1.0 / 6.0f64.sqrt();
        k[1][3] = -1.0 / (3.0 * 10.0f64.sqrt());

        k[2][2] = 2.0 / 5.0;
        k[2][4] = -1.0 / (5.0 * 21.0f64.sqrt());

        k[3][3] = 2.0 / 21.0;
        k[3][5] = -1.0 / (21.0 * 5.0f64.sqrt());

        k[4][4] = 2.0 / 45.0;
        k[4][6] = -1.0 / (9.0 * 77.0f64.sqrt());

        k[5][5] = 2.0 / 77.0;
        k[5][7] = -1.0 / (33.0 * 13.0f64.sqrt());

        k[6][6] = 2.0 / 117.0;
        k[6][8] = -1.0 / (13.0 * 165.0f64.sqrt());

        k[7][7] = 2.0 / 165.0;
        k[7][9] = -1.0 / (15.0 * 221.0f64.sqrt());

        k[8][8] = 2.0 / 221.0;
        k[8][10] = -1.0 / (17.0 * 285.0f64.sqrt());

        k[9][9] = 2.0 / 285.0;

        k[10][10] = 2.0 / 357.0;

        // mirror into the lower triangle
        for i in 0..MAX_P {
            for j in 0..i {
                k[i][j] = k[j][i];
            }
        }

        k
    }
}

impl Default for LobattoTables {
    fn default() -> Self {
        Self::new()
    }
}
