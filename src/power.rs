//! Real powers of packed symmetric matrices via eigendecomposition.
//!
//! `A^t = E diag(λ^t) Eᵀ`, with every eigenvalue at or below
//! [`EIGEN_ZERO_TOL`] mapped to zero instead of being raised to `t`.
//! For `t = −1` this is the Moore–Penrose pseudo-inverse, which is what
//! the singular Laplacian V needs.

use crate::linalg::symmetric_eigen;
use crate::packed::PackedSymmetric;
use crate::types::{SmacofError, SmacofResult, EIGEN_ZERO_TOL};

/// Raise a symmetric packed matrix to the real power `power`.
pub fn mpower(a: &PackedSymmetric, power: f64) -> SmacofResult<PackedSymmetric> {
    if !power.is_finite() {
        return Err(SmacofError::InvalidArgument(format!("matrix power {power}")));
    }
    let n = a.order();
    let eig = symmetric_eigen(a)?;
    let scaled: Vec<f64> = eig
        .values
        .iter()
        .map(|&l| if l > EIGEN_ZERO_TOL { l.powf(power) } else { 0.0 })
        .collect();

    let e = &eig.vectors;
    let mut out = PackedSymmetric::zeros(n);
    for j in 0..n {
        for i in j..n {
            let mut s = 0.0;
            for (k, &lk) in scaled.iter().enumerate() {
                if lk != 0.0 {
                    s += e[[i, k]] * e[[j, k]] * lk;
                }
            }
            out.set(i, j, s);
        }
    }
    Ok(out)
}

/// Moore–Penrose pseudo-inverse, `mpower(a, -1)`.
pub fn pseudo_inverse(a: &PackedSymmetric) -> SmacofResult<PackedSymmetric> {
    mpower(a, -1.0)
}
