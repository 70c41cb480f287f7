//! Pairwise Euclidean distances of a configuration and the raw stress loss.

use crate::index::{strict_len, strict_lower_index};
use crate::types::{SmacofError, SmacofResult};
use ndarray::Array2;

/// Distances between all rows of `x` (n × p), strict-lower packed.
///
/// Coincident points give 0; nothing here can fail.
pub fn distances(x: &Array2<f64>) -> Vec<f64> {
    let n = x.nrows();
    let mut d = vec![0.0; strict_len(n)];
    distances_into(x, &mut d);
    d
}

/// In-place variant of [`distances`]; `out` must have length n(n-1)/2.
pub fn distances_into(x: &Array2<f64>, out: &mut [f64]) {
    let (n, p) = x.dim();
    debug_assert_eq!(out.len(), strict_len(n));
    for j in 0..n.saturating_sub(1) {
        for i in j + 1..n {
            let mut sq = 0.0;
            for s in 0..p {
                let diff = x[[i, s]] - x[[j, s]];
                sq += diff * diff;
            }
            out[strict_lower_index(i, j, n)] = sq.sqrt();
        }
    }
}

/// Weighted stress  σ = ½ Σ w_k (δ_k − d_k)².
pub fn loss(d: &[f64], w: &[f64], delta: &[f64]) -> SmacofResult<f64> {
    if d.len() != w.len() || d.len() != delta.len() {
        return Err(SmacofError::Shape(format!(
            "loss: distances {}, weights {}, dissimilarities {}",
            d.len(),
            w.len(),
            delta.len()
        )));
    }
    Ok(raw_loss(d, w, delta))
}

/// Unchecked stress; callers guarantee equal lengths.
pub(crate) fn raw_loss(d: &[f64], w: &[f64], delta: &[f64]) -> f64 {
    0.5 * d
        .iter()
        .zip(w)
        .zip(delta)
        .map(|((&dk, &wk), &ek)| wk * (ek - dk) * (ek - dk))
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn unit_square_distances() {
        let x = array![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let d = distances(&x);
        let s2 = 2f64.sqrt();
        // (1,0) (2,0) (3,0) (2,1) (3,1) (3,2)
        let expected = [1.0, s2, 1.0, 1.0, s2, 1.0];
        for (a, b) in d.iter().zip(expected) {
            assert_relative_eq!(*a, b, epsilon = 1e-15);
        }
    }

    #[test]
    fn relabelling_permutes_distances() {
        let x = array![[0.3, -1.0], [2.0, 0.5], [-0.7, 0.1]];
        let y = array![[2.0, 0.5], [0.3, -1.0], [-0.7, 0.1]];
        let n = 3;
        let dx = distances(&x);
        let dy = distances(&y);
        let perm = [1, 0, 2];
        for j in 0..n {
            for i in j + 1..n {
                let (a, b) = (perm[i].max(perm[j]), perm[i].min(perm[j]));
                assert_eq!(dx[strict_lower_index(i, j, n)], dy[strict_lower_index(a, b, n)]);
                assert!(dx[strict_lower_index(i, j, n)] >= 0.0);
            }
        }
    }

    #[test]
    fn coincident_points_have_zero_distance() {
        let x = array![[1.0, 2.0], [1.0, 2.0]];
        assert_eq!(distances(&x), vec![0.0]);
    }

    #[test]
    fn loss_is_half_weighted_sum_of_squares() {
        let d = [1.0, 2.0, 3.0];
        let delta = [2.0, 2.0, 1.0];
        let w = [1.0, 5.0, 0.5];
        assert_relative_eq!(loss(&d, &w, &delta).unwrap(), 0.5 * (1.0 + 0.0 + 0.5 * 4.0));
        assert!(loss(&d, &w[..2], &delta).is_err());
    }
}
