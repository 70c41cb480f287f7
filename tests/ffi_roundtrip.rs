//! FFI round-trip tests — call the `extern "C"` functions directly from Rust
//! to catch marshalling bugs before a C caller enters the picture.
//!
//! These mirror the safe-Rust tests in `integration.rs` but go through
//! raw pointers, `c_int` sizes and the Rust-owned output buffer.

use approx::assert_relative_eq;
use smacof::ffi::*;
use smacof::optimizer;
use std::os::raw::{c_char, c_int};
use std::ptr;

/// Unit square, strict-lower packed.
fn square_delta() -> Vec<f64> {
    let r2 = 2.0_f64.sqrt();
    vec![1.0, r2, 1.0, 1.0, r2, 1.0]
}

fn last_error() -> String {
    let mut buf = vec![0 as c_char; 256];
    let len = unsafe { smacof_last_error(buf.as_mut_ptr(), buf.len() as c_int) };
    assert!(len >= 0);
    let bytes: Vec<u8> = buf.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn run_matches_rust_api() {
    let delta = vec![1.2, 0.8, 1.5, 1.1, 0.9, 1.4, 1.0, 1.3, 0.7, 1.6];
    let expected = optimizer::run(&delta, 2, 50, 1e-8, None).unwrap();

    let mut iterations: c_int = 0;
    let mut coords: *mut f64 = ptr::null_mut();
    let mut stress = 0.0;
    let rc = unsafe {
        smacof_run(
            delta.as_ptr(),
            delta.len() as c_int,
            2,
            50,
            1e-8,
            ptr::null(),
            &mut iterations,
            &mut coords,
            &mut stress,
        )
    };
    assert_eq!(rc, 0, "smacof_run failed: {}", last_error());
    assert!(!coords.is_null());
    assert_eq!(iterations as usize, expected.iterations);
    assert_relative_eq!(stress, expected.stress, epsilon = 1e-14);

    let got = unsafe { std::slice::from_raw_parts(coords, 10) }.to_vec();
    for (g, e) in got.iter().zip(expected.column_major()) {
        assert_relative_eq!(*g, e, epsilon = 1e-14);
    }
    unsafe { smacof_coordinates_free(coords, 10) };
}

#[test]
fn run_with_start_configuration() {
    let delta = square_delta();
    // column-major 4 × 2: a slightly perturbed square
    let x0 = [0.1, 1.0, 0.9, 0.0, 0.0, 0.1, 1.0, 0.9];

    let mut iterations: c_int = 0;
    let mut coords: *mut f64 = ptr::null_mut();
    let mut stress = 1.0;
    let rc = unsafe {
        smacof_run(
            delta.as_ptr(),
            6,
            2,
            500,
            1e-10,
            x0.as_ptr(),
            &mut iterations,
            &mut coords,
            &mut stress,
        )
    };
    assert_eq!(rc, 0, "smacof_run failed: {}", last_error());
    assert!(iterations >= 1);
    assert!(stress < 1e-6, "stress = {stress}");
    unsafe { smacof_coordinates_free(coords, 8) };
}

#[test]
fn bad_length_reports_error() {
    let delta = [1.0, 1.0, 1.0, 1.0];
    let mut iterations: c_int = -7;
    let mut coords: *mut f64 = ptr::null_mut();
    let mut stress = -1.0;
    let rc = unsafe {
        smacof_run(
            delta.as_ptr(),
            4,
            2,
            10,
            1e-6,
            ptr::null(),
            &mut iterations,
            &mut coords,
            &mut stress,
        )
    };
    assert_eq!(rc, 1);
    assert!(coords.is_null());
    assert_eq!(iterations, -7);
    assert!(last_error().contains("packed length 4"));
}

#[test]
fn negative_sizes_are_rejected() {
    let delta = square_delta();
    let mut iterations: c_int = 0;
    let mut coords: *mut f64 = ptr::null_mut();
    let mut stress = 0.0;
    let rc = unsafe {
        smacof_run(
            delta.as_ptr(),
            6,
            -2,
            10,
            1e-6,
            ptr::null(),
            &mut iterations,
            &mut coords,
            &mut stress,
        )
    };
    assert_eq!(rc, 1);
    assert!(last_error().contains("does not fit"));
}

#[test]
fn orthogonalize_in_place() {
    // column-major 4 × 2
    let mut a = [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0];
    let rc = unsafe { smacof_orthogonalize(a.as_mut_ptr(), 4, 2) };
    assert_eq!(rc, 0);
    let (c0, c1) = a.split_at(4);
    let dot = |u: &[f64], v: &[f64]| u.iter().zip(v).map(|(x, y)| x * y).sum::<f64>();
    assert_relative_eq!(dot(c0, c0), 1.0, epsilon = 1e-12);
    assert_relative_eq!(dot(c1, c1), 1.0, epsilon = 1e-12);
    assert_relative_eq!(dot(c0, c1), 0.0, epsilon = 1e-12);
}

#[test]
fn orthogonalize_rejects_wide_input() {
    let mut a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let rc = unsafe { smacof_orthogonalize(a.as_mut_ptr(), 2, 3) };
    assert_eq!(rc, 1);
    assert_eq!(a, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn last_error_truncates_and_reports_length() {
    let mut a = [1.0, 2.0];
    let rc = unsafe { smacof_orthogonalize(a.as_mut_ptr(), 1, 2) };
    assert_eq!(rc, 1);

    let full = last_error();
    let mut small = [0x7f as c_char; 5];
    let len = unsafe { smacof_last_error(small.as_mut_ptr(), 5) };
    assert_eq!(len as usize, full.len());
    assert_eq!(small[4], 0);
    assert_eq!(small[0] as u8, full.as_bytes()[0]);

    assert_eq!(unsafe { smacof_last_error(ptr::null_mut(), -1) }, -1);
}
