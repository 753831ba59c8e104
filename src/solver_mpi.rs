//! # Solvers for data distributed over a processor group
//!
//! - [`cyclic_reduce`]: batched tridiagonal systems, rows distributed along x
pub mod cyclic_reduce;
pub use cyclic_reduce::CyclicReduce;
