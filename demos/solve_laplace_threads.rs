//! Run example:
//!
//! cargo run --example solve_laplace_threads --release
//!
//! Helmholtz problem periodic in x and z, distributed over 4 threads:
//!
//!  ∇²f - f = rhs
use laplace_cyclic::mesh::{Mesh, Partition};
use laplace_cyclic::mpi::{run_group, Transport};
use laplace_cyclic::{Coefficients, FieldPerp, LaplaceConfig, LaplaceCyclic};
use std::f64::consts::PI;

fn main() {
    // parameter
    let (nx, ngz, nranks) = (128, 17, 4);
    let exact = |x: f64, z: f64| (2. * PI * x).cos() * z.sin();

    let results = run_group(nranks, |comm| {
        // Setup local mesh
        let part = Partition::for_rank(nx, comm.size(), comm.rank(), true).unwrap();
        let mesh = Mesh::uniform(part, 1, ngz, 1., 2. * PI).unwrap();

        // Setup rhs and solution
        let rhs = FieldPerp::from_fn(&mesh, 0, |x, z| -(4. * PI * PI + 2.) * exact(x, z));
        let expected = FieldPerp::from_fn(&mesh, 0, exact);

        // Solve
        let mut solver = LaplaceCyclic::new(LaplaceConfig::default(), mesh, comm).unwrap();
        let coefs = Coefficients::default().with_a(-1.);
        let f = solver.solve_with(&rhs, &coefs).unwrap();
        (f, expected)
    });

    // Compare
    for (f, expected) in &results {
        approx_eq(&f.v, &expected.v);
    }
    println!("solved on {} threads", nranks);
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
