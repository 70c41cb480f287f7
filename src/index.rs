//! Packed-storage index arithmetic.
//!
//! Every offset into a packed or flat buffer in this crate is computed
//! here.  All coordinates are **0-based**.  Two triangular layouts are
//! used, both column-wise (column `j` outer, row `i` inner):
//!
//!   * *strict lower*    — pairs `(i, j)` with `i > j`, no diagonal,
//!     length `n(n-1)/2`.  Used for dissimilarities, weights, distances.
//!   * *inclusive lower* — pairs `(i, j)` with `i >= j`, diagonal stored,
//!     length `n(n+1)/2`.  Used for symmetric matrices (B, V, V⁺, H).
//!
//! For n = 4 the two layouts enumerate as
//!
//! ```text
//!   strict            inclusive
//!   .                 0
//!   0 .               1 4
//!   1 3 .             2 5 7
//!   2 4 5 .           3 6 8 9
//! ```

// ─────────────────────────────────────────────────────────────
//  Forward maps  (coordinates → offset)
// ─────────────────────────────────────────────────────────────

/// Offset of the `k`-th slot of a pairwise vector.
#[inline]
pub fn vector_index(k: usize) -> usize {
    k
}

/// Offset of `(row, col)` in a column-major array with leading dimension `ld`.
#[inline]
pub fn dense_index(row: usize, col: usize, ld: usize) -> usize {
    row + col * ld
}

/// Offset of `(row, col, slab)` in a column-major `nrows × ncols × _` array.
#[inline]
pub fn array3_index(row: usize, col: usize, slab: usize, nrows: usize, ncols: usize) -> usize {
    row + col * nrows + slab * nrows * ncols
}

/// Offset of pair `(i, j)`, `i > j`, in strict-lower packed storage of order `n`.
#[inline]
pub fn strict_lower_index(i: usize, j: usize, n: usize) -> usize {
    debug_assert!(i > j && i < n, "strict index ({i},{j}) out of range for n={n}");
    j * n - j * (j + 1) / 2 + (i - j - 1)
}

/// Offset of `(i, j)`, `i >= j`, in inclusive-lower packed storage of order `n`.
#[inline]
pub fn inclusive_lower_index(i: usize, j: usize, n: usize) -> usize {
    debug_assert!(i >= j && i < n, "inclusive index ({i},{j}) out of range for n={n}");
    j * n - j * (j + 1) / 2 + i
}

/// Inclusive-lower offset of `(i, j)` in either triangle of a symmetric matrix.
#[inline]
pub fn symmetric_index(i: usize, j: usize, n: usize) -> usize {
    if i >= j {
        inclusive_lower_index(i, j, n)
    } else {
        inclusive_lower_index(j, i, n)
    }
}

// ─────────────────────────────────────────────────────────────
//  Lengths
// ─────────────────────────────────────────────────────────────

/// Number of strict-lower slots for order `n`.
#[inline]
pub fn strict_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Number of inclusive-lower slots for order `n`.
#[inline]
pub fn inclusive_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Recover the matrix order from a strict-lower length.
///
/// Returns `None` unless `m = n(n-1)/2` for some `n >= 2`.
pub fn order_from_strict_len(m: usize) -> Option<usize> {
    let disc = 1.0 + 8.0 * m as f64;
    let n = ((1.0 + disc.sqrt()) / 2.0).round() as usize;
    (n >= 2 && strict_len(n) == m).then_some(n)
}

/// Recover the matrix order from an inclusive-lower length.
///
/// Returns `None` unless `r = n(n+1)/2` for some `n >= 1`.
pub fn order_from_inclusive_len(r: usize) -> Option<usize> {
    let disc = 1.0 + 8.0 * r as f64;
    let n = ((disc.sqrt() - 1.0) / 2.0).round() as usize;
    (n >= 1 && inclusive_len(n) == r).then_some(n)
}

// ─────────────────────────────────────────────────────────────
//  Inverse maps  (offset → coordinates)
// ─────────────────────────────────────────────────────────────

/// Coordinates `(i, j)`, `i > j`, of strict-lower offset `k` (order `n`).
///
/// `None` when `k >= n(n-1)/2`.
pub fn strict_lower_coords(k: usize, n: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for j in 0..n.saturating_sub(1) {
        let len = n - 1 - j;
        if k < start + len {
            return Some((j + 1 + (k - start), j));
        }
        start += len;
    }
    None
}

/// Coordinates `(i, j)`, `i >= j`, of inclusive-lower offset `k` (order `n`).
///
/// `None` when `k >= n(n+1)/2`.
pub fn inclusive_lower_coords(k: usize, n: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for j in 0..n {
        let len = n - j;
        if k < start + len {
            return Some((j + (k - start), j));
        }
        start += len;
    }
    None
}
