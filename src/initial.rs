//! Classical (Torgerson) scaling used as the default start configuration.

use crate::index::{strict_len, strict_lower_index};
use crate::linalg::symmetric_eigen;
use crate::packed::PackedSymmetric;
use crate::types::{SmacofError, SmacofResult, EIGEN_ZERO_TOL};
use log::{debug, warn};
use ndarray::{Array2, ShapeBuilder};

/// Start configuration X0 (n × p) from dissimilarities δ.
///
/// Squared dissimilarities are double centered into a Gram matrix whose
/// top-p eigenpairs give the coordinates: column k is `e_k · sqrt(λ_k)`.
/// Columns whose eigenvalue is at or below [`EIGEN_ZERO_TOL`] are left at
/// exactly zero; a clearly negative one means δ is not Euclidean.
pub fn initial_configuration(delta: &[f64], n: usize, p: usize) -> SmacofResult<Array2<f64>> {
    if delta.len() != strict_len(n) {
        return Err(SmacofError::Shape(format!(
            "{} dissimilarities for n = {n}",
            delta.len()
        )));
    }
    if p == 0 || p > n {
        return Err(SmacofError::InvalidArgument(format!(
            "dimension p = {p} must lie in 1..={n}"
        )));
    }

    let mut squared = PackedSymmetric::zeros(n);
    for j in 0..n {
        for i in j + 1..n {
            let dij = delta[strict_lower_index(i, j, n)];
            squared.set(i, j, dij * dij);
        }
    }
    let gram = squared.double_center();
    let eig = symmetric_eigen(&gram)?;

    let mut x = Array2::zeros((n, p).f());
    for k in 0..p {
        // eigenvalues are ascending; take from the top
        let col = n - 1 - k;
        let lambda = eig.values[col];
        if lambda < -EIGEN_ZERO_TOL {
            warn!("classical scaling: dropped negative eigenvalue {lambda:e} for dimension {k}");
            continue;
        }
        if lambda <= EIGEN_ZERO_TOL {
            debug!("classical scaling: dimension {k} has eigenvalue {lambda:e}, left at zero");
            continue;
        }
        let scale = lambda.sqrt();
        for i in 0..n {
            x[[i, k]] = eig.vectors[[i, col]] * scale;
        }
    }
    Ok(x)
}
