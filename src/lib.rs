//! **smacof** — metric multidimensional scaling by stress majorization.
//!
//! Given dissimilarities δ between n objects (strict-lower packed, length
//! n(n-1)/2), find an n × p configuration X whose Euclidean distances
//! minimise the weighted raw stress σ(X) = ½ Σ w (δ − d(X))².
//!
//! 1. **Indexing** (`index`, `packed`): packed triangular storage.
//! 2. **Distances** (`distance`): d(X) and σ.
//! 3. **Majorization** (`majorize`): B(X), V, Guttman transform,
//!    gradient and Hessian.
//! 4. **Start** (`initial`): classical (Torgerson) scaling.
//! 5. **Matrix powers** (`power`): eigen-based powers and the pseudo-inverse.
//! 6. **Driver** (`optimizer`): the SMACOF loop, plus L-BFGS via `argmin`.
//! 7. **Linear algebra** (`linalg`): eigen, QR and SPD solve wrappers.
//! 8. **FFI** (`ffi`): C-compatible API.

pub mod types;
pub mod index;
pub mod packed;
pub mod distance;
pub mod majorize;
pub mod power;
pub mod initial;
pub mod linalg;
pub mod optimizer;
pub mod ffi;

pub use optimizer::{refine, run, smacof};
pub use types::{
    RefineOptions, SmacofError, SmacofOptions, SmacofOutput, SmacofProblem, SmacofResult,
};
