//! Guttman majorization kernel: B(X), V, the Guttman transform, and the
//! analytic gradient / Hessian of stress.
//!
//! With  σ(X) = ½ Σ w_ij (δ_ij − d_ij(X))²  the kernel uses
//!
//!   ∇σ(X) = V X − B(X) X
//!   X⁺    = V⁺ B(X) X              (Guttman transform)
//!
//! where V is the weighted graph Laplacian of w and B(X) the Laplacian of
//! w δ / d.  Both are stored as [`PackedSymmetric`].

use crate::distance::{distances, raw_loss};
use crate::index::{strict_len, strict_lower_index};
use crate::packed::PackedSymmetric;
use crate::types::{SmacofError, SmacofResult, HESSIAN_DIST_TOL};
use ndarray::Array2;

fn check_pairs(what: &str, v: &[f64], n: usize) -> SmacofResult<()> {
    if v.len() != strict_len(n) {
        return Err(SmacofError::Shape(format!(
            "{what} has length {}, expected {} for n = {n}",
            v.len(),
            strict_len(n)
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
//  Laplacians
// ─────────────────────────────────────────────────────────────

/// B(X): off-diagonal −w δ / d, diagonal = row sums of the magnitudes.
///
/// A pair at distance zero contributes nothing.
pub fn bmat(d: &[f64], w: &[f64], delta: &[f64], n: usize) -> SmacofResult<PackedSymmetric> {
    check_pairs("distances", d, n)?;
    check_pairs("weights", w, n)?;
    check_pairs("dissimilarities", delta, n)?;
    let mut b = PackedSymmetric::zeros(n);
    fill_bmat(d, w, delta, &mut b);
    Ok(b)
}

pub(crate) fn fill_bmat(d: &[f64], w: &[f64], delta: &[f64], b: &mut PackedSymmetric) {
    let n = b.order();
    b.fill(0.0);
    for j in 0..n {
        for i in j + 1..n {
            let k = strict_lower_index(i, j, n);
            let dinv = if d[k] == 0.0 { 0.0 } else { 1.0 / d[k] };
            let elem = w[k] * delta[k] * dinv;
            b.set(i, j, -elem);
            b.add(i, i, elem);
            b.add(j, j, elem);
        }
    }
}

/// V: off-diagonal −w, diagonal = row sums of w.  Constant for a run.
pub fn vmat(w: &[f64], n: usize) -> SmacofResult<PackedSymmetric> {
    check_pairs("weights", w, n)?;
    let mut v = PackedSymmetric::zeros(n);
    for j in 0..n {
        for i in j + 1..n {
            let elem = w[strict_lower_index(i, j, n)];
            v.set(i, j, -elem);
            v.add(i, i, elem);
            v.add(j, j, elem);
        }
    }
    Ok(v)
}

// ─────────────────────────────────────────────────────────────
//  Guttman transform and gradient
// ─────────────────────────────────────────────────────────────

/// One majorization step  X⁺ = V⁺ (B X).
pub fn guttman(
    x: &Array2<f64>,
    b: &PackedSymmetric,
    vpinv: &PackedSymmetric,
) -> SmacofResult<Array2<f64>> {
    let bx = b.premultiply(x)?;
    vpinv.premultiply(&bx)
}

/// ∇σ(X) = V X − B X.
pub fn gradient(
    x: &Array2<f64>,
    b: &PackedSymmetric,
    v: &PackedSymmetric,
) -> SmacofResult<Array2<f64>> {
    let mut g = v.premultiply(x)?;
    g -= &b.premultiply(x)?;
    Ok(g)
}

/// Result of a fused Guttman update.
#[derive(Debug, Clone)]
pub struct GuttmanStep {
    pub x: Array2<f64>,
    pub d: Vec<f64>,
    pub b: PackedSymmetric,
    pub stress: f64,
}

/// Guttman transform followed by distances, B and σ at the new point.
pub fn update(
    x_old: &Array2<f64>,
    b_old: &PackedSymmetric,
    vpinv: &PackedSymmetric,
    w: &[f64],
    delta: &[f64],
) -> SmacofResult<GuttmanStep> {
    let n = x_old.nrows();
    check_pairs("weights", w, n)?;
    check_pairs("dissimilarities", delta, n)?;
    let x = guttman(x_old, b_old, vpinv)?;
    let d = distances(&x);
    let mut b = PackedSymmetric::zeros(n);
    fill_bmat(&d, w, delta, &mut b);
    let stress = raw_loss(&d, w, delta);
    Ok(GuttmanStep { x, d, b, stress })
}

// ─────────────────────────────────────────────────────────────
//  Second derivatives
// ─────────────────────────────────────────────────────────────

/// The "H-matrix" of order n·p, coordinates ordered dimension-major
/// (all n points of dimension 0, then dimension 1, …).
///
/// Block (s, t) uses the Laplacian `W_st` of
/// `w δ (x_is − x_js)(x_it − x_jt) / d³`  (zero when d³ < 1e-10).
/// Diagonal blocks hold `B − W_ss`, off-diagonal blocks `−W_st`.
pub fn hmat(
    x: &Array2<f64>,
    b: &PackedSymmetric,
    d: &[f64],
    w: &[f64],
    delta: &[f64],
) -> SmacofResult<PackedSymmetric> {
    let (n, p) = x.dim();
    check_pairs("distances", d, n)?;
    check_pairs("weights", w, n)?;
    check_pairs("dissimilarities", delta, n)?;
    if b.order() != n {
        return Err(SmacofError::Shape(format!("B has order {}, expected {n}", b.order())));
    }

    let mut h = PackedSymmetric::zeros(n * p);
    let mut work = PackedSymmetric::zeros(n);
    for s in 0..p {
        for t in 0..=s {
            work.fill(0.0);
            for j in 0..n {
                for i in j + 1..n {
                    let k = strict_lower_index(i, j, n);
                    let f1 = x[[i, s]] - x[[j, s]];
                    let f2 = x[[i, t]] - x[[j, t]];
                    let d3 = d[k] * d[k] * d[k];
                    let inv = if d3 < HESSIAN_DIST_TOL { 0.0 } else { 1.0 / d3 };
                    let elem = f1 * f2 * w[k] * delta[k] * inv;
                    work.set(i, j, -elem);
                    work.add(i, i, elem);
                    work.add(j, j, elem);
                }
            }
            if s == t {
                for j in 0..n {
                    for i in j..n {
                        h.set(s * n + i, s * n + j, b.get(i, j) - work.get(i, j));
                    }
                }
            } else {
                for i in 0..n {
                    for j in 0..n {
                        h.set(s * n + i, t * n + j, -work.get(i, j));
                    }
                }
            }
        }
    }
    Ok(h)
}

/// Analytic Hessian of σ in the same ordering as [`hmat`]:
/// `V ⊗ I − Hmat`.
pub fn hessian(
    x: &Array2<f64>,
    b: &PackedSymmetric,
    v: &PackedSymmetric,
    d: &[f64],
    w: &[f64],
    delta: &[f64],
) -> SmacofResult<PackedSymmetric> {
    let (n, p) = x.dim();
    if v.order() != n {
        return Err(SmacofError::Shape(format!("V has order {}, expected {n}", v.order())));
    }
    let h = hmat(x, b, d, w, delta)?;
    let mut out = PackedSymmetric::from_packed(h.as_slice().iter().map(|v| -v).collect())?;
    for s in 0..p {
        for j in 0..n {
            for i in j..n {
                out.add(s * n + i, s * n + j, v.get(i, j));
            }
        }
    }
    Ok(out)
}
