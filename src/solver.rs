//! # Tridiagonal solvers and the Laplacian inversion
//!
//! - [`tdma`]: serial Thomas algorithm, open and periodic
//! - [`tridag`]: assembly of the tridiagonal system of one z mode
//! - [`cyclic`]: the solver facade [`LaplaceCyclic`]
#![allow(clippy::module_name_repetitions)]
pub mod cyclic;
pub mod tdma;
pub mod tridag;
pub use cyclic::LaplaceCyclic;
use ndarray::{Array1, Array2};
pub use tdma::Tdma;
pub use tridag::{ModeRows, SystemBuilder};

/// Diagonal `offset` of a square matrix (negative: below the main diagonal)
pub(crate) fn diag<T: Copy>(a: &Array2<T>, offset: isize) -> Array1<T> {
    let n = a.nrows();
    let k = offset.unsigned_abs();
    if offset >= 0 {
        (0..n - k).map(|i| a[[i, i + k]]).collect()
    } else {
        (k..n).map(|i| a[[i, i - k]]).collect()
    }
}
