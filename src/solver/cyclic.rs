//! # Laplacian inversion with FFT in z and cyclic reduction in x
//!
//! Solves
//!
//!  ∇·(C ∇f) + A f = D rhs
//!
//! on one y slice at a time. Every owned x row is transformed to
//! Fourier modes in z, each mode gives one tridiagonal system in x,
//! all systems are solved together by [`CyclicReduce`] and the
//! solution is transformed back.
//!
//! # Examples
//! `demos/solve_laplace_threads.rs`
use super::tridag::{ModeRows, SystemBuilder};
use crate::config::LaplaceConfig;
use crate::error::{Error, Result};
use crate::fft::ZFft;
use crate::field::{Coefficients, FieldPerp};
use crate::mesh::Mesh;
use crate::mpi::Transport;
use crate::solver_mpi::CyclicReduce;
use crate::types::{Cplx, Real};
use ndarray::{Array1, Array2};
use num_traits::Zero;

/// Laplacian inversion of perpendicular slices
#[derive(Debug)]
pub struct LaplaceCyclic<C> {
    config: LaplaceConfig,
    mesh: Mesh,
    builder: SystemBuilder,
    fft: ZFft,
    cr: CyclicReduce<C>,
    /// Tridiagonal rows, `(nmode, n_local)`
    a: Array2<Cplx>,
    b: Array2<Cplx>,
    c: Array2<Cplx>,
    /// Transformed rhs and solution, `(nmode, n_local)`
    bcmplx: Array2<Cplx>,
    xcmplx: Array2<Cplx>,
    /// Transformed prescribed values of the inner and outer boundary, `(2, nmode)`
    bvals: Array2<Cplx>,
    /// Prescribed values along z
    brow: Array1<Real>,
}

impl<C: Transport> LaplaceCyclic<C> {
    /// Solver on the local part `mesh` of the grid, `comm` is the group
    /// of processors that share the x axis.
    ///
    /// # Errors
    /// If the group does not match the partition of the mesh, the
    /// geometry does not match the partition, or the configuration is
    /// invalid.
    pub fn new(config: LaplaceConfig, mesh: Mesh, comm: C) -> Result<Self> {
        mesh.check()?;
        let part = &mesh.partition;
        if comm.size() != part.nranks || comm.rank() != part.rank {
            return Err(Error::Partition(format!(
                "processor {} of {} cannot own the partition of rank {} of {}",
                comm.rank(),
                comm.size(),
                part.rank,
                part.nranks
            )));
        }
        let builder = SystemBuilder::new(&config, &mesh)?;
        let fft = ZFft::new(mesh.ncz(), mesh.zlength)?;
        let (nmode, n) = (mesh.nmode(), mesh.n_local());
        let cr = CyclicReduce::new(comm, n, nmode, part.periodic)?;
        tracing::debug!(
            rank = part.rank,
            start = part.start,
            end = part.end,
            nmode,
            flags = config.flags.bits(),
            "laplace inversion set up"
        );
        Ok(Self {
            config,
            builder,
            fft,
            cr,
            a: Array2::zeros((nmode, n)),
            b: Array2::zeros((nmode, n)),
            c: Array2::zeros((nmode, n)),
            bcmplx: Array2::zeros((nmode, n)),
            xcmplx: Array2::zeros((nmode, n)),
            bvals: Array2::zeros((2, nmode)),
            brow: Array1::zeros(mesh.ngz),
            mesh,
        })
    }

    /// Configuration fixed at construction
    pub fn config(&self) -> &LaplaceConfig {
        &self.config
    }

    /// Local mesh
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Invert the pure Laplacian (A = 0, C = 1, D = 1)
    ///
    /// # Errors
    /// See [`LaplaceCyclic::solve_with`].
    pub fn solve(&mut self, rhs: &FieldPerp) -> Result<FieldPerp> {
        self.solve_with(rhs, &Coefficients::default())
    }

    /// Invert ∇·(C ∇f) + A f = D rhs. The result carries the y index of `rhs`.
    ///
    /// Must be called on every processor of the group, for the same slice.
    ///
    /// # Errors
    /// On shape mismatches of `rhs` or `coefs` (before any
    /// communication), a degenerate pivot, or a failed exchange.
    pub fn solve_with(&mut self, rhs: &FieldPerp, coefs: &Coefficients) -> Result<FieldPerp> {
        rhs.check(&self.mesh)?;
        coefs.check(&self.mesh)?;
        let jy = rhs.index();
        let _span = tracing::debug_span!("laplace_cyclic", jy).entered();
        let n = self.mesh.n_local();

        for ix in 0..n {
            let zshift = self.zshift(ix, jy);
            self.fft
                .forward(&rhs.v.row(ix), zshift, &mut self.bcmplx.column_mut(ix));
        }
        self.transform_boundary_values(jy);

        for kz in 0..self.mesh.nmode() {
            let mut rows = ModeRows {
                a: self.a.row_mut(kz),
                b: self.b.row_mut(kz),
                c: self.c.row_mut(kz),
                r: self.bcmplx.row_mut(kz),
            };
            let bvals = [self.bvals[[0, kz]], self.bvals[[1, kz]]];
            self.builder.build_mode(
                kz,
                self.fft.kwave(kz),
                jy,
                &self.mesh,
                coefs,
                bvals,
                &mut rows,
            );
        }

        self.cr.set_coefs(&self.a, &self.b, &self.c)?;
        self.cr.solve(&self.bcmplx, &mut self.xcmplx)?;

        let mut result = FieldPerp::zeros(&self.mesh, jy);
        for ix in 0..n {
            let zshift = self.zshift(ix, jy);
            self.fft
                .inverse(&self.xcmplx.column(ix), zshift, &mut result.v.row_mut(ix));
        }
        Ok(result)
    }

    fn zshift(&self, ix: usize, jy: usize) -> Option<Real> {
        if self.config.shift_x_derivs {
            Some(self.mesh.zshift[[ix, jy]])
        } else {
            None
        }
    }

    /// Prescribed values of the physical boundaries owned by this processor
    fn transform_boundary_values(&mut self, jy: usize) {
        self.bvals.fill(Cplx::zero());
        let part = &self.mesh.partition;
        let last = self.mesh.n_local() - 1;
        let sides = [
            (part.inner_boundary(), 0, self.builder.inner()),
            (part.outer_boundary(), last, self.builder.outer()),
        ];
        for (side, (owned, ix, boundary)) in sides.iter().enumerate() {
            let value = match boundary.set_value() {
                Some(v) if *owned => v,
                _ => continue,
            };
            value.sample(&self.mesh, self.mesh.x[*ix], jy, &mut self.brow.view_mut());
            let zshift = if self.config.shift_x_derivs {
                Some(self.mesh.zshift[[*ix, jy]])
            } else {
                None
            };
            self.fft
                .forward(&self.brow, zshift, &mut self.bvals.row_mut(side));
        }
    }
}
