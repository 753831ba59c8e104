//! Assembly of the tridiagonal system of a single z mode
//!
//! Interior rows discretise
//!
//!  ∇·(C ∇f) + A f = D rhs
//!
//! with second order central differences in x. Rows at a physical x
//! boundary are replaced by the row of the boundary operator. Rows at
//! a processor interface are interior rows.
use crate::boundary::{BoundaryRow, Side, SideBoundary, ValueSource};
use crate::config::{InvertFlags, LaplaceConfig};
use crate::error::Result;
use crate::field::Coefficients;
use crate::mesh::Mesh;
use crate::types::{Cplx, Real};
use ndarray::ArrayViewMut1;
use num_traits::{One, Zero};

/// Rows of one mode, all of length `n_local`
///
/// `r` holds the transformed rhs on entry and the rhs of the system on exit.
#[derive(Debug)]
pub struct ModeRows<'a> {
    /// Sub diagonal
    pub a: ArrayViewMut1<'a, Cplx>,
    /// Main diagonal
    pub b: ArrayViewMut1<'a, Cplx>,
    /// Super diagonal
    pub c: ArrayViewMut1<'a, Cplx>,
    /// Right hand side
    pub r: ArrayViewMut1<'a, Cplx>,
}

impl<'a> ModeRows<'a> {
    fn identity(&mut self) {
        self.a.fill(Cplx::zero());
        self.b.fill(Cplx::one());
        self.c.fill(Cplx::zero());
        self.r.fill(Cplx::zero());
    }

    fn set_row(&mut self, ix: usize, [a, b, c]: [Cplx; 3]) {
        self.a[ix] = a;
        self.b[ix] = b;
        self.c[ix] = c;
    }
}

/// Builds the tridiagonal rows of every mode
#[derive(Debug, Clone)]
pub struct SystemBuilder {
    inner: SideBoundary,
    outer: SideBoundary,
    zero_dc: bool,
    max_mode: usize,
}

impl SystemBuilder {
    /// Builder of a validated configuration
    ///
    /// # Errors
    /// If the configuration is rejected by [`LaplaceConfig::validate`].
    pub fn new(config: &LaplaceConfig, mesh: &Mesh) -> Result<Self> {
        config.validate(mesh)?;
        let (inner, outer) = config.boundaries()?;
        Ok(Self {
            inner,
            outer,
            zero_dc: config.flags.contains(InvertFlags::ZERO_DC),
            max_mode: config.max_mode(mesh.nmode()),
        })
    }

    /// Boundary treatment of the inner side
    pub fn inner(&self) -> &SideBoundary {
        &self.inner
    }

    /// Boundary treatment of the outer side
    pub fn outer(&self) -> &SideBoundary {
        &self.outer
    }

    /// Mode `kz` is not solved, its solution is zero
    pub fn is_skipped(&self, kz: usize) -> bool {
        kz > self.max_mode || (kz == 0 && self.zero_dc)
    }

    /// Fill the rows of mode `kz` with wave number `kwave` on slice `jy`.
    ///
    /// `bvals` are the transformed prescribed values of this mode at
    /// the inner and outer boundary, ignored unless a side takes its
    /// value from a set source. Boundary rows taking their value from
    /// the rhs are not scaled by D.
    #[allow(clippy::too_many_arguments)]
    pub fn build_mode(
        &self,
        kz: usize,
        kwave: Real,
        jy: usize,
        mesh: &Mesh,
        coefs: &Coefficients,
        bvals: [Cplx; 2],
        rows: &mut ModeRows,
    ) {
        if self.is_skipped(kz) {
            rows.identity();
            return;
        }
        let n = mesh.n_local();
        let part = &mesh.partition;
        let first = usize::from(part.inner_boundary());
        let last = n - usize::from(part.outer_boundary());
        let ik = Cplx::new(0., kwave);
        for ix in first..last {
            let dx = mesh.dx[ix];
            let c0 = coefs.c.at(ix, jy);
            let coef1 = c0 * mesh.g11[ix] / (dx * dx);
            let coef2 = c0 * mesh.g33[ix];
            let coef3 = c0 * mesh.g13[ix] / dx;
            let coef4 = if coefs.c.is_scalar() {
                0.
            } else {
                let (cm, cp) = coefs.c.neighbours(ix, jy);
                mesh.g11[ix] * (cp - cm) / (4. * dx * dx)
            };
            rows.set_row(
                ix,
                [
                    Cplx::from(coef1 - coef4) - ik * coef3,
                    Cplx::from(-2. * coef1 - kwave * kwave * coef2 + coefs.a.at(ix, jy)),
                    Cplx::from(coef1 + coef4) + ik * coef3,
                ],
            );
            rows.r[ix] *= coefs.d.at(ix, jy);
        }

        if part.inner_boundary() {
            self.boundary_row(kz, Side::Inner, 0, mesh, bvals[0], rows);
        }
        if part.outer_boundary() {
            self.boundary_row(kz, Side::Outer, n - 1, mesh, bvals[1], rows);
        }
    }

    fn boundary_row(
        &self,
        kz: usize,
        side: Side,
        ix: usize,
        mesh: &Mesh,
        bval: Cplx,
        rows: &mut ModeRows,
    ) {
        let op = match side {
            Side::Inner => self.inner.for_mode(kz),
            Side::Outer => self.outer.for_mode(kz),
        };
        rows.set_row(ix, op.coefficients(side, mesh.dx[ix]));
        rows.r[ix] = match op.source() {
            ValueSource::Zero => Cplx::zero(),
            ValueSource::Rhs => rows.r[ix],
            ValueSource::Set(_) => bval,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryValue;
    use crate::field::Coefficient;
    use crate::mesh::Partition;
    use ndarray::{Array1, Array2};

    fn approx_eq(result: Cplx, expected: Cplx) {
        let dif = 1e-12;
        if (result - expected).norm() > dif {
            panic!("Large difference of values, got {} expected {}.", result, expected)
        }
    }

    struct Rows {
        a: Array1<Cplx>,
        b: Array1<Cplx>,
        c: Array1<Cplx>,
        r: Array1<Cplx>,
    }

    impl Rows {
        fn new(r: Array1<Cplx>) -> Self {
            let n = r.len();
            Self {
                a: Array1::zeros(n),
                b: Array1::zeros(n),
                c: Array1::zeros(n),
                r,
            }
        }

        fn view(&mut self) -> ModeRows<'_> {
            ModeRows {
                a: self.a.view_mut(),
                b: self.b.view_mut(),
                c: self.c.view_mut(),
                r: self.r.view_mut(),
            }
        }
    }

    fn mesh(rank: usize, nranks: usize) -> Mesh {
        // dx = 1
        let part = Partition::for_rank(5, nranks, rank, false).unwrap();
        Mesh::uniform(part, 1, 9, 4., 2. * std::f64::consts::PI).unwrap()
    }

    #[test]
    fn test_interior_rows() {
        let mesh = mesh(0, 1)
            .with_metric(Array1::ones(5), Array1::from_elem(5, 2.), Array1::from_elem(5, 0.5))
            .unwrap();
        let builder = SystemBuilder::new(&LaplaceConfig::default(), &mesh).unwrap();
        let coefs = Coefficients::default().with_a(3.).with_d(2.);
        let mut rows = Rows::new(Array1::from_elem(5, Cplx::new(1., 1.)));
        builder.build_mode(2, 2., 0, &mesh, &coefs, [Cplx::zero(); 2], &mut rows.view());
        // coef1 = 1, coef2 = 2, coef3 = 0.5
        approx_eq(rows.a[2], Cplx::new(1., -1.));
        approx_eq(rows.b[2], Cplx::new(-2. - 8. + 3., 0.));
        approx_eq(rows.c[2], Cplx::new(1., 1.));
        approx_eq(rows.r[2], Cplx::new(2., 2.));
        // Dirichlet zero on both sides
        approx_eq(rows.b[0], Cplx::one());
        approx_eq(rows.c[0], Cplx::zero());
        approx_eq(rows.r[0], Cplx::zero());
        approx_eq(rows.a[4], Cplx::zero());
        approx_eq(rows.r[4], Cplx::zero());
    }

    #[test]
    fn test_gradient_of_c() {
        let mesh = mesh(0, 1);
        let builder = SystemBuilder::new(&LaplaceConfig::default(), &mesh).unwrap();
        // C = 1 + x, guard rows included
        let c = Array2::from_shape_fn((7, 1), |(i, _)| i as f64);
        let coefs = Coefficients::default().with_c(Coefficient::Field(c));
        let mut rows = Rows::new(Array1::zeros(5));
        builder.build_mode(0, 0., 0, &mesh, &coefs, [Cplx::zero(); 2], &mut rows.view());
        // row 2: C = 3, (C[i+1] - C[i-1]) / 4 = 0.5
        approx_eq(rows.a[2], Cplx::new(2.5, 0.));
        approx_eq(rows.b[2], Cplx::new(-6., 0.));
        approx_eq(rows.c[2], Cplx::new(3.5, 0.));
    }

    #[test]
    fn test_boundary_sources() {
        let mesh = mesh(0, 1);
        let config = LaplaceConfig::new(
            InvertFlags::AC_INNER_GRAD | InvertFlags::INNER_RHS | InvertFlags::OUTER_SET,
        )
        .with_outer_value(BoundaryValue::Constant(1.));
        let builder = SystemBuilder::new(&config, &mesh).unwrap();
        let coefs = Coefficients::default().with_d(5.);
        let bvals = [Cplx::new(9., 9.), Cplx::new(0.5, 0.)];

        let mut rows = Rows::new(Array1::from_elem(5, Cplx::new(2., 0.)));
        builder.build_mode(1, 1., 0, &mesh, &coefs, bvals, &mut rows.view());
        approx_eq(rows.b[0], Cplx::new(-1., 0.));
        approx_eq(rows.c[0], Cplx::new(1., 0.));
        approx_eq(rows.r[0], Cplx::new(2., 0.));
        approx_eq(rows.r[1], Cplx::new(10., 0.));
        approx_eq(rows.b[4], Cplx::one());
        approx_eq(rows.r[4], Cplx::new(0.5, 0.));

        // DC mode is Dirichlet on the inner side
        let mut rows = Rows::new(Array1::from_elem(5, Cplx::new(2., 0.)));
        builder.build_mode(0, 0., 0, &mesh, &coefs, bvals, &mut rows.view());
        approx_eq(rows.b[0], Cplx::one());
        approx_eq(rows.c[0], Cplx::zero());
        approx_eq(rows.r[0], Cplx::new(2., 0.));
    }

    #[test]
    fn test_processor_interfaces_are_interior() {
        let mesh = mesh(1, 2);
        let builder = SystemBuilder::new(&LaplaceConfig::default(), &mesh).unwrap();
        let mut rows = Rows::new(Array1::from_elem(2, Cplx::one()));
        builder.build_mode(
            0,
            0.,
            0,
            &mesh,
            &Coefficients::default(),
            [Cplx::zero(); 2],
            &mut rows.view(),
        );
        // global rows 3 and 4: interior and outer boundary
        approx_eq(rows.a[0], Cplx::one());
        approx_eq(rows.b[0], Cplx::new(-2., 0.));
        approx_eq(rows.r[0], Cplx::one());
        approx_eq(rows.b[1], Cplx::one());
        approx_eq(rows.r[1], Cplx::zero());
    }

    #[test]
    fn test_skipped_modes() {
        let mesh = mesh(0, 1);
        let config = LaplaceConfig::new(InvertFlags::ZERO_DC).with_max_mode(2);
        let builder = SystemBuilder::new(&config, &mesh).unwrap();
        assert!(builder.is_skipped(0));
        assert!(!builder.is_skipped(2));
        assert!(builder.is_skipped(3));
        for kz in [0, 3] {
            let mut rows = Rows::new(Array1::from_elem(5, Cplx::new(1., 2.)));
            builder.build_mode(
                kz,
                kz as f64,
                0,
                &mesh,
                &Coefficients::default(),
                [Cplx::one(); 2],
                &mut rows.view(),
            );
            for ix in 0..5 {
                approx_eq(rows.a[ix], Cplx::zero());
                approx_eq(rows.b[ix], Cplx::one());
                approx_eq(rows.r[ix], Cplx::zero());
            }
        }
    }
}
