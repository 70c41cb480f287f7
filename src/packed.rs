//! Symmetric matrices in inclusive-lower packed storage.
//!
//! `PackedSymmetric` stores only the `n(n+1)/2` independent entries of an
//! `n × n` symmetric matrix (see [`crate::index`] for the layout).  It
//! provides the handful of operations the majorization kernel needs:
//! premultiplying a dense matrix, converting to/from dense, double
//! centering and direct sums.

use crate::index::{
    array3_index, dense_index, inclusive_len, inclusive_lower_index, order_from_inclusive_len,
    strict_len, strict_lower_index, symmetric_index, vector_index,
};
use crate::types::{SmacofError, SmacofResult};
use ndarray::{Array2, ShapeBuilder};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct PackedSymmetric {
    n: usize,
    data: Vec<f64>,
}

impl PackedSymmetric {
    pub fn zeros(n: usize) -> Self {
        Self { n, data: vec![0.0; inclusive_len(n)] }
    }

    /// Wrap an existing inclusive-lower packed buffer.
    pub fn from_packed(data: Vec<f64>) -> SmacofResult<Self> {
        let n = order_from_inclusive_len(data.len()).ok_or_else(|| {
            SmacofError::Shape(format!("{} is not a packed symmetric length", data.len()))
        })?;
        Ok(Self { n, data })
    }

    /// Order of the matrix.
    pub fn order(&self) -> usize {
        self.n
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[symmetric_index(i, j, self.n)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[symmetric_index(i, j, self.n)] = value;
    }

    #[inline]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        self.data[symmetric_index(i, j, self.n)] += value;
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Lower triangle of a square dense matrix (upper triangle is ignored).
    pub fn from_dense(a: &Array2<f64>) -> SmacofResult<Self> {
        let (rows, cols) = a.dim();
        if rows != cols {
            return Err(SmacofError::Shape(format!("expected square matrix, got {rows}×{cols}")));
        }
        let mut out = Self::zeros(rows);
        for j in 0..rows {
            for i in j..rows {
                out.data[inclusive_lower_index(i, j, rows)] = a[[i, j]];
            }
        }
        Ok(out)
    }

    /// Full symmetric dense matrix (column-major).
    pub fn to_dense(&self) -> Array2<f64> {
        let n = self.n;
        Array2::from_shape_fn((n, n).f(), |(i, j)| self.get(i, j))
    }

    /// `Y = A X` for dense `X` (n × m).
    pub fn premultiply(&self, x: &Array2<f64>) -> SmacofResult<Array2<f64>> {
        let n = self.n;
        let (rows, m) = x.dim();
        if rows != n {
            return Err(SmacofError::Shape(format!(
                "cannot premultiply {rows}×{m} by packed matrix of order {n}"
            )));
        }
        let mut y = Array2::zeros((n, m).f());
        for s in 0..m {
            for i in 0..n {
                let mut acc = 0.0;
                for k in 0..n {
                    acc += self.get(i, k) * x[[k, s]];
                }
                y[[i, s]] = acc;
            }
        }
        Ok(y)
    }

    /// Row sums (equal to column sums by symmetry).
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n)
            .map(|i| (0..self.n).map(|j| self.get(i, j)).sum())
            .collect()
    }

    /// Block-diagonal direct sum `diag(self, other)`.
    pub fn direct_sum(&self, other: &Self) -> Self {
        let (n, m) = (self.n, other.n);
        let mut out = Self::zeros(n + m);
        for j in 0..n {
            for i in j..n {
                out.set(i, j, self.get(i, j));
            }
        }
        for j in 0..m {
            for i in j..m {
                out.set(n + i, n + j, other.get(i, j));
            }
        }
        out
    }

    /// Torgerson double centering: `−½ (A − r_i − r_j + g)` where `r` are
    /// row means and `g` the grand mean of `A`.
    pub fn double_center(&self) -> Self {
        let n = self.n;
        let nf = n as f64;
        let row_means: Vec<f64> = self.row_sums().into_iter().map(|s| s / nf).collect();
        let grand = row_means.iter().sum::<f64>() / nf;
        let mut out = Self::zeros(n);
        for j in 0..n {
            for i in j..n {
                let a = self.get(i, j);
                let (ri, rj) = (row_means[vector_index(i)], row_means[vector_index(j)]);
                out.set(i, j, -0.5 * (a - ri - rj + grand));
            }
        }
        out
    }

    /// Symmetric matrix with zero diagonal built from a strict-lower vector.
    pub fn from_strict(values: &[f64]) -> SmacofResult<Self> {
        let n = crate::index::order_from_strict_len(values.len())
            .ok_or(SmacofError::NotTriangular { len: values.len() })?;
        let mut out = Self::zeros(n);
        for j in 0..n {
            for i in j + 1..n {
                out.set(i, j, values[strict_lower_index(i, j, n)]);
            }
        }
        Ok(out)
    }
}

/// Prints the inclusive lower triangle, one row per line.
impl fmt::Display for PackedSymmetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        for i in 0..self.n {
            for j in 0..=i {
                write!(f, " {:+.*} ", prec, self.get(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Display adapter for a strict-lower packed vector; the diagonal is
/// rendered as a row of `*`.
pub struct StrictLowerDisplay<'a> {
    values: &'a [f64],
    n: usize,
}

impl<'a> StrictLowerDisplay<'a> {
    pub fn new(values: &'a [f64], n: usize) -> SmacofResult<Self> {
        if values.len() != strict_len(n) {
            return Err(SmacofError::Shape(format!(
                "{} values for strict triangle of order {n}",
                values.len()
            )));
        }
        Ok(Self { values, n })
    }
}

impl fmt::Display for StrictLowerDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        // "+0." plus the digits
        let width = prec + 3;
        for i in 0..self.n {
            for j in 0..i {
                write!(f, " {:+.*} ", prec, self.values[strict_lower_index(i, j, self.n)])?;
            }
            write!(f, " {} ", "*".repeat(width))?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Display adapter for a flat column-major `nrows × ncols` buffer.
pub struct DenseDisplay<'a> {
    values: &'a [f64],
    nrows: usize,
    ncols: usize,
}

impl<'a> DenseDisplay<'a> {
    pub fn new(values: &'a [f64], nrows: usize, ncols: usize) -> SmacofResult<Self> {
        if values.len() != nrows * ncols {
            return Err(SmacofError::Shape(format!(
                "{} values for a {nrows}×{ncols} matrix",
                values.len()
            )));
        }
        Ok(Self { values, nrows, ncols })
    }
}

impl fmt::Display for DenseDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        for i in 0..self.nrows {
            for j in 0..self.ncols {
                write!(f, " {:+.*} ", prec, self.values[dense_index(i, j, self.nrows)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Display adapter for a flat column-major `nrows × ncols × nslabs`
/// array; slabs are separated by a blank line.
pub struct Array3Display<'a> {
    values: &'a [f64],
    dims: (usize, usize, usize),
}

impl<'a> Array3Display<'a> {
    pub fn new(values: &'a [f64], nrows: usize, ncols: usize, nslabs: usize) -> SmacofResult<Self> {
        if values.len() != nrows * ncols * nslabs {
            return Err(SmacofError::Shape(format!(
                "{} values for a {nrows}×{ncols}×{nslabs} array",
                values.len()
            )));
        }
        Ok(Self { values, dims: (nrows, ncols, nslabs) })
    }
}

impl fmt::Display for Array3Display<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        let (nrows, ncols, nslabs) = self.dims;
        for k in 0..nslabs {
            if k > 0 {
                writeln!(f)?;
            }
            for i in 0..nrows {
                for j in 0..ncols {
                    let v = self.values[array3_index(i, j, k, nrows, ncols)];
                    write!(f, " {:+.*} ", prec, v)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn dense_round_trip_is_symmetric() {
        let a = array![[4.0, 1.0, 2.0], [1.0, 5.0, 3.0], [2.0, 3.0, 6.0]];
        let p = PackedSymmetric::from_dense(&a).unwrap();
        assert_eq!(p.as_slice(), &[4.0, 1.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(p.to_dense(), a);
    }

    #[test]
    fn premultiply_matches_dense_product() {
        let a = array![[2.0, -1.0, 0.0], [-1.0, 2.0, -1.0], [0.0, -1.0, 2.0]];
        let x = array![[1.0, 0.5], [2.0, -1.0], [3.0, 4.0]];
        let p = PackedSymmetric::from_dense(&a).unwrap();
        assert_eq!(p.premultiply(&x).unwrap(), a.dot(&x));
    }

    #[test]
    fn premultiply_rejects_wrong_rows() {
        let p = PackedSymmetric::zeros(3);
        assert!(p.premultiply(&Array2::zeros((2, 2))).is_err());
    }

    #[test]
    fn direct_sum_is_block_diagonal() {
        let a = PackedSymmetric::from_dense(&array![[1.0, 2.0], [2.0, 3.0]]).unwrap();
        let b = PackedSymmetric::from_dense(&array![[7.0]]).unwrap();
        let c = a.direct_sum(&b).to_dense();
        assert_eq!(c, array![[1.0, 2.0, 0.0], [2.0, 3.0, 0.0], [0.0, 0.0, 7.0]]);
    }

    #[test]
    fn double_center_has_zero_row_sums() {
        let sq = PackedSymmetric::from_strict(&[1.0, 4.0, 9.0, 1.0, 4.0, 1.0]).unwrap();
        for s in sq.double_center().row_sums() {
            assert!(s.abs() < 1e-12);
        }
    }

    #[test]
    fn displays_render_every_row() {
        let p = PackedSymmetric::from_dense(&array![[1.0, 2.0], [2.0, 3.0]]).unwrap();
        let s = format!("{p:.1}");
        assert_eq!(s.lines().count(), 2);
        assert!(s.contains("+3.0"));

        let d = [0.5, 1.5, 2.5];
        let s = format!("{}", StrictLowerDisplay::new(&d, 3).unwrap());
        assert_eq!(s.lines().count(), 3);
        assert!(s.contains("+2.5000"));
        assert!(StrictLowerDisplay::new(&d, 4).is_err());
    }

    #[test]
    fn dense_display_walks_columns() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let s = format!("{:.1}", DenseDisplay::new(&x, 2, 3).unwrap());
        assert_eq!(s, " +1.0  +3.0  +5.0 \n +2.0  +4.0  +6.0 \n");
        assert!(DenseDisplay::new(&x, 4, 2).is_err());
    }

    #[test]
    fn array3_display_prints_each_slab() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let s = format!("{:.1}", Array3Display::new(&x, 1, 2, 2).unwrap());
        assert_eq!(s, " +1.0  +2.0 \n\n +3.0  +4.0 \n");
        assert!(Array3Display::new(&x, 2, 2, 2).is_err());
    }

    #[test]
    fn from_packed_checks_length() {
        assert!(PackedSymmetric::from_packed(vec![0.0; 6]).is_ok());
        assert!(PackedSymmetric::from_packed(vec![0.0; 5]).is_err());
    }
}
