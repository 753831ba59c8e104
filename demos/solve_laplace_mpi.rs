//! Run example:
//!
//! cargo mpirun --np 4 --example solve_laplace_mpi --features mpi --release
//!
//! Laplace problem with prescribed values on both x boundaries:
//!
//!  ∇²f = 0, f(0, z) = cos(z), f(1, z) = 0
use laplace_cyclic::mesh::{Mesh, Partition};
use laplace_cyclic::mpi::{initialize, MpiComm, Transport};
use laplace_cyclic::{BoundaryValue, FieldPerp, InvertFlags, LaplaceConfig, LaplaceCyclic};
use mpi::traits::Communicator;
use std::f64::consts::PI;

fn main() {
    // parameter
    let (nx, ngz) = (257, 33);
    // mpi
    let universe = initialize().unwrap();
    let comm = MpiComm::new(universe.world());

    // Setup local mesh
    let part = Partition::for_rank(nx, comm.size(), comm.rank(), false).unwrap();
    let mesh = Mesh::uniform(part, 1, ngz, 1., 2. * PI).unwrap();

    // f = sinh(1 - x) / sinh(1) cos(z)
    let exact = |x: f64, z: f64| (1. - x).sinh() / 1_f64.sinh() * z.cos();
    let rhs = FieldPerp::zeros(&mesh, 0);
    let expected = FieldPerp::from_fn(&mesh, 0, exact);

    // Setup solver
    let config = LaplaceConfig::new(InvertFlags::INNER_SET | InvertFlags::OUTER_SET)
        .with_inner_value(BoundaryValue::generator(|_, _, z| z.cos()))
        .with_outer_value(BoundaryValue::Constant(0.));
    let mut solver = LaplaceCyclic::new(config, mesh, comm).unwrap();

    // Solve
    let f = solver.solve(&rhs).unwrap();

    // Compare
    approx_eq(&f.v, &expected.v);
    if universe.world().rank() == 0 {
        println!("solved on {} processors", universe.world().size());
    }
}

fn approx_eq<S, D>(result: &ndarray::ArrayBase<S, D>, expected: &ndarray::ArrayBase<S, D>)
where
    S: ndarray::Data<Elem = f64>,
    D: ndarray::Dimension,
{
    let dif = 1e-3;
    for (a, b) in expected.iter().zip(result.iter()) {
        if (a - b).abs() > dif {
            panic!("Large difference of values, got {} expected {}.", b, a)
        }
    }
}
