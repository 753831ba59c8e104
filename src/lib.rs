//! # `laplace_cyclic`: Parallel inversion of perpendicular Laplacians
//!
//! Solves the elliptic equation
//!
//!  ∇·(C ∇f) + A f = D rhs
//!
//! on slices of a structured grid that is periodic in z and distributed
//! over a group of processors in x. Each processor owns a contiguous
//! range of x points.
//!
//! # Details
//!
//! The solve of one slice goes through three stages:
//! - Fourier transform in z, see [`fft::ZFft`]
//! - one tridiagonal system per mode, see [`solver::SystemBuilder`]
//! - parallel cyclic reduction of all systems at once,
//! see [`solver_mpi::CyclicReduce`]
//!
//! Processors talk through a [`mpi::Transport`]. A group of threads
//! ([`mpi::ThreadComm`]) is always available, an mpi communicator
//! (`mpi::MpiComm`) with the feature `mpi`. The latter requires an mpi
//! installation and libclang.
//!
//! # Example
//! Solve f'' = 1 on 4 processors ( Run with `cargo run --bin laplace-cyclic` )
//! ```
//! use laplace_cyclic::mesh::{Mesh, Partition};
//! use laplace_cyclic::mpi::{run_group, Transport};
//! use laplace_cyclic::{FieldPerp, LaplaceConfig, LaplaceCyclic};
//!
//! let (nx, ngz) = (33, 17);
//! let results = run_group(4, |comm| {
//!     let part = Partition::for_rank(nx, comm.size(), comm.rank(), false)?;
//!     let mesh = Mesh::uniform(part, 1, ngz, 1., 1.)?;
//!     let rhs = FieldPerp::from_fn(&mesh, 0, |_, _| 1.);
//!     let mut solver = LaplaceCyclic::new(LaplaceConfig::default(), mesh, comm)?;
//!     solver.solve(&rhs)
//! });
//! assert!(results.iter().all(|r| r.is_ok()));
//! ```
#![warn(missing_docs)]
#![allow(clippy::unnecessary_cast)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#[macro_use]
extern crate enum_dispatch;
pub mod boundary;
pub mod config;
pub mod error;
pub mod fft;
pub mod field;
pub mod mesh;
pub mod mpi;
pub mod solver;
pub mod solver_mpi;
pub mod types;

pub use boundary::BoundaryValue;
pub use config::{InvertFlags, LaplaceConfig};
pub use error::{Error, Result};
pub use field::{Coefficient, Coefficients, FieldPerp};
pub use solver::LaplaceCyclic;
