//! Dense linear-algebra primitives.
//!
//! Thin wrappers over the external solvers: symmetric eigendecomposition
//! and QR come from `nalgebra`, the SPD solve goes through the `sprs-ldl`
//! LDLᵀ factorisation.  Each call owns its scratch space, so there is no
//! workspace-query step for callers to drive.  Every status the backend
//! reports is turned into a `SmacofError`.

use crate::packed::PackedSymmetric;
use crate::types::{SmacofError, SmacofResult};
use nalgebra::{DMatrix, SymmetricEigen, QR};
use ndarray::{Array1, Array2, ShapeBuilder};
use sprs::{CsMat, FillInReduction, SymmetryCheck, TriMat};
use sprs_ldl::Ldl;
use std::os::raw::c_int;

/// Upper bound on Jacobi-style sweeps inside the symmetric eigensolver.
const MAX_EIGEN_ITERATIONS: usize = 10_000;

// ─────────────────────────────────────────────────────────────
//  ndarray ↔ nalgebra bridges
// ─────────────────────────────────────────────────────────────

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    DMatrix::from_fn(rows, cols, |i, j| a[[i, j]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()).f(), |(i, j)| m[(i, j)])
}

// ─────────────────────────────────────────────────────────────
//  Symmetric eigendecomposition
// ─────────────────────────────────────────────────────────────

/// Eigenpairs of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct Eigen {
    /// Eigenvalues in ascending order.
    pub values: Array1<f64>,
    /// Orthonormal eigenvectors; column k belongs to `values[k]`.
    pub vectors: Array2<f64>,
}

/// Full eigendecomposition of a packed symmetric matrix.
pub fn symmetric_eigen(a: &PackedSymmetric) -> SmacofResult<Eigen> {
    let n = a.order();
    if let Some(k) = a.as_slice().iter().position(|v| !v.is_finite()) {
        return Err(SmacofError::Eigen(format!("non-finite packed entry at offset {k}")));
    }
    let m = DMatrix::from_fn(n, n, |i, j| a.get(i, j));
    let eig = SymmetricEigen::try_new(m, f64::EPSILON, MAX_EIGEN_ITERATIONS).ok_or_else(|| {
        SmacofError::Eigen(format!(
            "no convergence within {MAX_EIGEN_ITERATIONS} iterations (order {n})"
        ))
    })?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));

    let values = Array1::from_iter(order.iter().map(|&k| eig.eigenvalues[k]));
    let vectors =
        Array2::from_shape_fn((n, n).f(), |(i, c)| eig.eigenvectors[(i, order[c])]);
    Ok(Eigen { values, vectors })
}

// ─────────────────────────────────────────────────────────────
//  SPD solve  (LDLᵀ with positive pivots)
// ─────────────────────────────────────────────────────────────

/// Solve `A X = B` for symmetric positive-definite `A` (n × n) and
/// right-hand sides `B` (n × k).
///
/// `A` is factorised once with `sprs-ldl` (reverse Cuthill–McKee
/// ordering); every pivot of D must be strictly positive.
pub fn spd_solve(a: &Array2<f64>, b: &Array2<f64>) -> SmacofResult<Array2<f64>> {
    let (n, cols) = a.dim();
    if n != cols {
        return Err(SmacofError::Shape(format!("spd_solve: A is {n}×{cols}")));
    }
    if b.nrows() != n {
        return Err(SmacofError::Shape(format!(
            "spd_solve: A is {n}×{n} but B has {} rows",
            b.nrows()
        )));
    }

    let mut tri = TriMat::new((n, n));
    for j in 0..n {
        for i in 0..n {
            let v = a[[i, j]];
            if v != 0.0 {
                tri.add_triplet(i, j, v);
            }
        }
    }
    let csc: CsMat<f64> = tri.to_csc();

    let ldl = Ldl::new()
        .fill_in_reduction(FillInReduction::ReverseCuthillMcKee)
        .check_symmetry(SymmetryCheck::DontCheckSymmetry)
        .numeric(csc.view())?;
    for (index, &pivot) in ldl.d().iter().enumerate() {
        if !(pivot > 0.0) {
            return Err(SmacofError::NotPositiveDefinite { index, pivot });
        }
    }

    let mut x = Array2::zeros((n, b.ncols()).f());
    for c in 0..b.ncols() {
        let rhs: Vec<f64> = b.column(c).to_vec();
        let sol = ldl.solve(rhs.as_slice());
        for i in 0..n {
            x[[i, c]] = sol[i];
        }
    }
    Ok(x)
}

// ─────────────────────────────────────────────────────────────
//  QR factorisation
// ─────────────────────────────────────────────────────────────

/// Householder QR of a tall matrix (rows ≥ cols).
pub struct QrFactors {
    qr: QR<f64, nalgebra::Dyn, nalgebra::Dyn>,
}

impl std::fmt::Debug for QrFactors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QrFactors(...)")
    }
}

/// Factorise `a = Q R`.
pub fn qr_factor(a: &Array2<f64>) -> SmacofResult<QrFactors> {
    let (rows, cols) = a.dim();
    if rows < cols {
        return Err(SmacofError::InvalidArgument(format!(
            "QR needs rows >= cols, got {rows}×{cols}"
        )));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(SmacofError::InvalidArgument("QR input has non-finite entries".into()));
    }
    Ok(QrFactors { qr: QR::new(to_dmatrix(a)) })
}

impl QrFactors {
    /// Explicit thin orthogonal factor Q (rows × cols).
    pub fn orthogonal_factor(&self) -> Array2<f64> {
        from_dmatrix(&self.qr.q())
    }

    /// Upper-triangular factor R (cols × cols).
    pub fn upper_factor(&self) -> Array2<f64> {
        from_dmatrix(&self.qr.r())
    }
}

/// Orthonormal basis of the column space of `a` (QR, then Q).
pub fn orthogonalize(a: &Array2<f64>) -> SmacofResult<Array2<f64>> {
    Ok(qr_factor(a)?.orthogonal_factor())
}

/// Orthogonal polynomial basis on the points 1..=n.
///
/// Column k of the power basis is `i^k`; orthogonalizing it gives a
/// complete set of n orthonormal polynomials.
pub fn orthogonal_polynomials(n: usize) -> SmacofResult<Array2<f64>> {
    if n == 0 {
        return Err(SmacofError::InvalidArgument("polynomial basis of order 0".into()));
    }
    let mut power = Array2::zeros((n, n).f());
    for i in 0..n {
        let t = (i + 1) as f64;
        power[[i, 0]] = 1.0;
        for k in 1..n {
            power[[i, k]] = power[[i, k - 1]] * t;
        }
    }
    orthogonalize(&power)
}

// ─────────────────────────────────────────────────────────────
//  Integer width at the native boundary
// ─────────────────────────────────────────────────────────────

/// Checked `usize → c_int`.
pub fn to_solver_int(value: usize) -> SmacofResult<c_int> {
    c_int::try_from(value).map_err(|_| SmacofError::Overflow {
        value: value as i128,
        target: "c_int",
    })
}

/// Checked `c_int → usize`; negative values are rejected.
pub fn from_solver_int(value: c_int) -> SmacofResult<usize> {
    usize::try_from(value).map_err(|_| SmacofError::Overflow {
        value: value as i128,
        target: "usize",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn eigenvalues_are_ascending_and_reconstruct() {
        let a = array![[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let eig = symmetric_eigen(&PackedSymmetric::from_dense(&a).unwrap()).unwrap();
        assert!(eig.values.windows(2).into_iter().all(|w| w[0] <= w[1]));
        let lambda = Array2::from_diag(&eig.values);
        let back = eig.vectors.dot(&lambda).dot(&eig.vectors.t());
        for (x, y) in back.iter().zip(a.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn eigen_rejects_nan() {
        let mut p = PackedSymmetric::zeros(2);
        p.set(1, 0, f64::NAN);
        assert!(matches!(symmetric_eigen(&p), Err(SmacofError::Eigen(_))));
    }

    #[test]
    fn spd_solve_recovers_known_solution() {
        let a = array![[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let x = array![[1.0, -2.0], [0.5, 0.0], [-1.0, 3.0]];
        let b = a.dot(&x);
        let got = spd_solve(&a, &b).unwrap();
        for (g, e) in got.iter().zip(x.iter()) {
            assert_relative_eq!(*g, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn spd_solve_rejects_indefinite() {
        let a = array![[1.0, 0.0], [0.0, -1.0]];
        let b = array![[1.0], [1.0]];
        assert!(spd_solve(&a, &b).is_err());
    }

    #[test]
    fn orthogonalize_gives_orthonormal_columns() {
        let a = array![[1.0, 1.0], [1.0, 2.0], [1.0, 3.0], [1.0, 4.0]];
        let q = orthogonalize(&a).unwrap();
        assert_eq!(q.dim(), (4, 2));
        let gram = q.t().dot(&q);
        for i in 0..2 {
            for j in 0..2 {
                let e = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(gram[[i, j]], e, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn polynomial_basis_first_column_is_constant() {
        let q = orthogonal_polynomials(4).unwrap();
        let c0 = q[[0, 0]];
        assert_relative_eq!(c0.abs(), 0.5, epsilon = 1e-12);
        for i in 1..4 {
            assert_relative_eq!(q[[i, 0]], c0, epsilon = 1e-12);
        }
    }

    #[test]
    fn solver_int_conversion_is_checked() {
        assert_eq!(to_solver_int(17).unwrap(), 17);
        assert!(to_solver_int(usize::MAX).is_err());
        assert_eq!(from_solver_int(5).unwrap(), 5);
        assert!(from_solver_int(-1).is_err());
    }
}
