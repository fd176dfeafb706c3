use nalgebra::DMatrix;
use std::io::{self, Write};

/// A symmetric band matrix storing only the upper `ku` super-diagonals
///
/// Storage is LAPACK-style packed column-major: column `j` of the logical
/// matrix occupies column `j` of a `(ku + 1) x n` rectangle, with the
/// diagonal in packed row `ku`. Only the upper triangle is held; `get`
/// answers for both triangles by symmetry and returns 0 outside the band.
///
/// Writes outside the stored band are silently discarded rather than
/// treated as errors: assembly only ever accumulates contributions within
/// the true bandwidth, so an out-of-band write carries no information.
#[derive(Clone, Debug)]
pub struct SymBandMatrix {
    data: Vec<f64>,
    n: usize,
    ku: usize,
}

impl SymBandMatrix {
    /// A zero-filled `n x n` matrix with `ku` super-diagonals
    pub fn new(n: usize, ku: usize) -> Self {
        let mut mtx = Self {
            data: Vec::new(),
            n: 0,
            ku: 0,
        };
        mtx.assign(n, ku);
        mtx
    }

    /// Reallocate wholesale to a zero-filled `n x n` matrix with `ku`
    /// super-diagonals, destroying previous contents
    pub fn assign(&mut self, n: usize, ku: usize) {
        self.data.clear();
        self.data.resize((ku + 1) * n, 0.0);
        self.n = n;
        self.ku = ku;
    }

    /// Matrix dimension
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored super-diagonals
    pub fn ku(&self) -> usize {
        self.ku
    }

    // packed offset of upper-triangle entry (row, col); row <= col in band
    fn idx(&self, row: usize, col: usize) -> usize {
        col * (self.ku + 1) + (self.ku + row - col)
    }

    // fold (row, col) onto the stored upper triangle
    fn upper(row: usize, col: usize) -> (usize, usize) {
        if row <= col {
            (row, col)
        } else {
            (col, row)
        }
    }

    /// Entry `(row, col)`, answering by symmetry; 0 outside the band
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.n && col < self.n, "band matrix index out of range");

        let (r, c) = Self::upper(row, col);
        if c - r <= self.ku {
            self.data[self.idx(r, c)]
        } else {
            0.0
        }
    }

    /// Overwrite entry `(row, col)`; a no-op outside the band
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        assert!(row < self.n && col < self.n, "band matrix index out of range");

        let (r, c) = Self::upper(row, col);
        if c - r <= self.ku {
            let i = self.idx(r, c);
            self.data[i] = val;
        }
    }

    /// Accumulate `val` into entry `(row, col)`; a no-op outside the band
    pub fn add(&mut self, row: usize, col: usize, val: f64) {
        assert!(row < self.n && col < self.n, "band matrix index out of range");

        let (r, c) = Self::upper(row, col);
        if c - r <= self.ku {
            let i = self.idx(r, c);
            self.data[i] += val;
        }
    }

    /// Expand to a dense symmetric matrix for the dense backend kernels
    pub fn to_dense(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.n, self.n, |r, c| self.get(r, c))
    }

    /// Dump the diagonal and each super-diagonal as plain text, for debugging
    pub fn write(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "DIAGONAL")?;
        for row in 0..self.n {
            writeln!(out, "{:4} {:.6}", row, self.get(row, row))?;
        }

        for ku in 1..=self.ku {
            writeln!(out, "SUPER-DIAGONAL {}", ku)?;
            for row in 0..self.n.saturating_sub(ku) {
                writeln!(out, "{:4} {:.6}", row, self.get(row, row + ku))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_round_trip_with_symmetry() {
        let mut mtx = SymBandMatrix::new(5, 2);

        mtx.set(1, 3, 4.5);
        mtx.set(2, 2, -1.0);

        assert_eq!(mtx.get(1, 3), 4.5);
        assert_eq!(mtx.get(3, 1), 4.5); // symmetric counterpart
        assert_eq!(mtx.get(2, 2), -1.0);
        assert_eq!(mtx.get(0, 4), 0.0); // outside the band
    }

    #[test]
    fn out_of_band_writes_are_discarded() {
        let mut mtx = SymBandMatrix::new(6, 1);

        mtx.set(0, 4, 7.0);
        mtx.add(5, 0, 3.0);

        assert_eq!(mtx.get(0, 4), 0.0);
        assert_eq!(mtx.get(5, 0), 0.0);
        // in-band entries are untouched
        for row in 0..6 {
            assert_eq!(mtx.get(row, row), 0.0);
        }
    }

    #[test]
    fn add_accumulates() {
        let mut mtx = SymBandMatrix::new(3, 1);

        mtx.add(0, 1, 1.5);
        mtx.add(1, 0, 2.5); // folded onto the same stored entry

        assert_eq!(mtx.get(0, 1), 4.0);
    }

    #[test]
    fn dense_expansion_is_symmetric() {
        let mut mtx = SymBandMatrix::new(4, 1);
        for i in 0..4 {
            mtx.set(i, i, 2.0);
            if i + 1 < 4 {
                mtx.set(i, i + 1, -1.0);
            }
        }

        let dense = mtx.to_dense();
        assert_eq!(dense.nrows(), 4);
        for r in 0..4 {
            for c in 0..4 {
                assert_eq!(dense[(r, c)], dense[(c, r)]);
                assert_eq!(dense[(r, c)], mtx.get(r, c));
            }
        }
    }

    #[test]
    fn write_dumps_all_diagonals() {
        let mut mtx = SymBandMatrix::new(3, 1);
        mtx.set(0, 0, 1.0);
        mtx.set(0, 1, 2.0);

        let mut buf = Vec::new();
        mtx.write(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("DIAGONAL"));
        assert!(text.contains("SUPER-DIAGONAL 1"));
    }
}
