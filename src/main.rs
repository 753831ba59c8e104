//! Run example:
//!
//! cargo run --bin laplace-cyclic --release -- 4
//!
//! Inverts the Laplacian of f = sin(pi x) cos(2 z) on a group of
//! threads (default 4) and prints the discretisation error.
//! Set `RUST_LOG=laplace_cyclic=debug` for solver logs.
use laplace_cyclic::mesh::{Mesh, Partition};
use laplace_cyclic::mpi::{run_group, Transport};
use laplace_cyclic::{FieldPerp, LaplaceConfig, LaplaceCyclic, Result};
use std::f64::consts::PI;
use tracing_subscriber::EnvFilter;

fn solve(nranks: usize, nx: usize, ngz: usize) -> Vec<Result<f64>> {
    let exact = |x: f64, z: f64| (PI * x).sin() * (2. * z).cos();
    run_group(nranks, |comm| {
        let part = Partition::for_rank(nx, comm.size(), comm.rank(), false)?;
        let mesh = Mesh::uniform(part, 1, ngz, 1., 2. * PI)?;
        let rhs = FieldPerp::from_fn(&mesh, 0, |x, z| -(PI * PI + 4.) * exact(x, z));
        let expected = FieldPerp::from_fn(&mesh, 0, exact);
        let mut solver = LaplaceCyclic::new(LaplaceConfig::default(), mesh, comm)?;
        let f = solver.solve(&rhs)?;
        Ok(f
            .v
            .iter()
            .zip(expected.v.iter())
            .fold(0., |err: f64, (a, b)| err.max((a - b).abs())))
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let nranks = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);
    let (nx, ngz) = (129, 33);
    tracing::info!(nranks, nx, ngz, "solving");

    let mut max_err = 0.;
    for (rank, res) in solve(nranks, nx, ngz).into_iter().enumerate() {
        match res {
            Ok(err) => max_err = f64::max(max_err, err),
            Err(e) => {
                eprintln!("rank {}: {}", rank, e);
                std::process::exit(1);
            }
        }
    }
    println!("max error: {:10.3e}", max_err);
}
