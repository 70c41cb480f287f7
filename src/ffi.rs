//! C-compatible FFI.
//!
//! All functions are `#[no_mangle] extern "C"`.
//!
//! Memory convention:
//!   - Caller allocates input arrays and passes pointers + lengths.
//!   - Coordinates produced by `smacof_run` are allocated by Rust and must
//!     be released with `smacof_coordinates_free`.
//!   - Sizes cross as `c_int` and are range-checked on the way in and out.
//!   - Every function returns 0 on success, 1 on error; the message of the
//!     last error on this thread is available from `smacof_last_error`.

use crate::linalg::{from_solver_int, orthogonalize, to_solver_int};
use crate::optimizer;
use crate::optimizer::configuration_from_column_major;
use crate::types::{SmacofError, SmacofResult};
use std::cell::RefCell;
use std::os::raw::{c_char, c_int};
use std::slice;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

fn set_last_error(e: &SmacofError) {
    log::debug!("ffi error: {e}");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = e.to_string());
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| slot.borrow_mut().clear());
}

fn status(result: SmacofResult<()>) -> i32 {
    match result {
        Ok(()) => {
            clear_last_error();
            0
        }
        Err(e) => {
            set_last_error(&e);
            1
        }
    }
}

fn require_non_null(is_null: bool, what: &str) -> SmacofResult<()> {
    if is_null {
        return Err(SmacofError::InvalidArgument(format!("{what} is null")));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
//  Scaling run
// ─────────────────────────────────────────────────────────────

/// Run SMACOF on `m` packed dissimilarities in `p` dimensions.
///
/// On success `*out_coordinates` points to a freshly allocated column-major
/// n × p buffer (release it with `smacof_coordinates_free(ptr, n * p)`),
/// `*out_iterations` holds the iteration count and `*out_stress` the
/// final stress.  `x0` may be null, otherwise it must hold n × p values.
///
/// Returns 0 on success, 1 on error.  Outputs are untouched on error.
///
/// # Safety
/// `delta` must be valid for `m` reads, `x0` (if non-null) for n·p reads,
/// and every output pointer must be valid for one write.
#[no_mangle]
pub unsafe extern "C" fn smacof_run(
    delta: *const f64,       // length = m
    m: c_int,
    p: c_int,
    itmax: c_int,
    eps: f64,
    x0: *const f64,          // n × p column-major, nullable
    // ── Outputs ──
    out_iterations: *mut c_int,
    out_coordinates: *mut *mut f64,
    out_stress: *mut f64,
) -> i32 {
    status((|| -> SmacofResult<()> {
        require_non_null(delta.is_null(), "delta")?;
        require_non_null(out_iterations.is_null(), "out_iterations")?;
        require_non_null(out_coordinates.is_null(), "out_coordinates")?;
        require_non_null(out_stress.is_null(), "out_stress")?;

        let m = from_solver_int(m)?;
        let p = from_solver_int(p)?;
        let itmax = from_solver_int(itmax)?;
        let delta = slice::from_raw_parts(delta, m);

        let n = crate::index::order_from_strict_len(m)
            .ok_or(SmacofError::NotTriangular { len: m })?;
        let start = if x0.is_null() {
            None
        } else {
            let len = n.checked_mul(p).ok_or(SmacofError::Overflow {
                value: n as i128 * p as i128,
                target: "usize",
            })?;
            Some(slice::from_raw_parts(x0, len))
        };

        let result = optimizer::run(delta, p, itmax, eps, start)?;
        let iterations = to_solver_int(result.iterations)?;

        let coords = result.column_major().into_boxed_slice();
        *out_coordinates = Box::into_raw(coords) as *mut f64;
        *out_iterations = iterations;
        *out_stress = result.stress;
        Ok(())
    })())
}

/// Free a coordinate buffer returned by `smacof_run`.
///
/// # Safety
/// `ptr` must come from `smacof_run` with the same `len`, and must not be
/// freed twice.  Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn smacof_coordinates_free(ptr: *mut f64, len: c_int) {
    if ptr.is_null() {
        return;
    }
    let Ok(len) = from_solver_int(len) else {
        return;
    };
    drop(Box::from_raw(slice::from_raw_parts_mut(ptr, len) as *mut [f64]));
}

// ─────────────────────────────────────────────────────────────
//  Orthogonalization
// ─────────────────────────────────────────────────────────────

/// Replace the column-major n × m matrix `a` (n ≥ m) by an orthonormal
/// basis of its column space.
///
/// Returns 0 on success, 1 on error; `a` is untouched on error.
///
/// # Safety
/// `a` must be valid for n·m reads and writes.
#[no_mangle]
pub unsafe extern "C" fn smacof_orthogonalize(a: *mut f64, n: c_int, m: c_int) -> i32 {
    status((|| -> SmacofResult<()> {
        require_non_null(a.is_null(), "a")?;
        let n = from_solver_int(n)?;
        let m = from_solver_int(m)?;
        let len = n.checked_mul(m).ok_or(SmacofError::Overflow {
            value: n as i128 * m as i128,
            target: "usize",
        })?;
        let buf = slice::from_raw_parts_mut(a, len);

        let q = orthogonalize(&configuration_from_column_major(buf, n, m)?)?;
        for (dst, src) in buf.iter_mut().zip(q.t().iter()) {
            *dst = *src;
        }
        Ok(())
    })())
}

// ─────────────────────────────────────────────────────────────
//  Error reporting
// ─────────────────────────────────────────────────────────────

/// Copy the last error message on this thread into `buf` as a
/// NUL-terminated string, truncating to `len - 1` bytes.
///
/// Returns the full message length in bytes (0 when there is no error),
/// or -1 if `len` is negative.
///
/// # Safety
/// `buf` must be valid for `len` writes, or null when `len` is 0.
#[no_mangle]
pub unsafe extern "C" fn smacof_last_error(buf: *mut c_char, len: c_int) -> i32 {
    let Ok(cap) = from_solver_int(len) else {
        return -1;
    };
    LAST_ERROR.with(|slot| {
        let msg = slot.borrow();
        let bytes = msg.as_bytes();
        if !buf.is_null() && cap > 0 {
            let out = slice::from_raw_parts_mut(buf as *mut u8, cap);
            let k = bytes.len().min(cap - 1);
            out[..k].copy_from_slice(&bytes[..k]);
            out[k] = 0;
        }
        c_int::try_from(bytes.len()).unwrap_or(c_int::MAX)
    })
}
