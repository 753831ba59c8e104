//! # Boundary conditions of the inversion
//!
//! The set of boundary kinds is closed: [`Dirichlet`] and [`Neumann`].
//! Both overwrite the tridiagonal row at a physical x boundary and
//! carry the source of their boundary value as data. Dispatch happens
//! through [`BoundaryOp`].
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::types::{Cplx, Real};
use ndarray::{Array2, ArrayViewMut1};
use num_traits::{One, Zero};
use std::fmt;
use std::sync::Arc;

/// Function of position `(x, y, z)`
pub type Generator = Arc<dyn Fn(Real, Real, Real) -> Real + Send + Sync>;

/// Which end of the x axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// First global x point
    Inner,
    /// Last global x point
    Outer,
}

/// Prescribed boundary values
#[derive(Clone)]
pub enum BoundaryValue {
    /// Same value on the whole boundary
    Constant(Real),
    /// Evaluated at the boundary coordinates
    Generator(Generator),
    /// Given per y slice and z point, shape `(ny, ngz)`
    Field(Array2<Real>),
}

impl fmt::Debug for BoundaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => write!(f, "Constant({})", v),
            Self::Generator(_) => write!(f, "Generator(..)"),
            Self::Field(v) => write!(f, "Field({:?})", v.shape()),
        }
    }
}

impl BoundaryValue {
    /// Boundary value from a function of `(x, y, z)`
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn(Real, Real, Real) -> Real + Send + Sync + 'static,
    {
        Self::Generator(Arc::new(f))
    }

    /// Check a field source against the mesh
    ///
    /// # Errors
    /// If a field does not have shape `(ny, ngz)`, or a constant is not finite.
    pub fn check(&self, mesh: &Mesh) -> Result<()> {
        match self {
            Self::Constant(v) if !v.is_finite() => {
                Err(Error::Config(format!("boundary value is {}", v)))
            }
            Self::Field(v) if v.shape() != [mesh.ny, mesh.ngz] => Err(Error::ShapeMismatch {
                what: "boundary value",
                expected: vec![mesh.ny, mesh.ngz],
                actual: v.shape().to_vec(),
            }),
            _ => Ok(()),
        }
    }

    /// Boundary values along z at x coordinate `x` of slice `jy`
    pub fn sample(&self, mesh: &Mesh, x: Real, jy: usize, out: &mut ArrayViewMut1<Real>) {
        match self {
            Self::Constant(v) => out.fill(*v),
            Self::Generator(f) => {
                let y = mesh.y(jy);
                for (jz, o) in out.iter_mut().enumerate() {
                    *o = f(x, y, mesh.z(jz));
                }
            }
            Self::Field(v) => out.assign(&v.row(jy)),
        }
    }
}

/// Where the right hand side of a boundary row comes from
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// Homogeneous condition
    Zero,
    /// Boundary row of the right hand side slice
    Rhs,
    /// Prescribed values
    Set(BoundaryValue),
}

/// Tridiagonal row of a physical boundary
#[enum_dispatch]
pub trait BoundaryRow {
    /// Sub, main and super diagonal of the boundary row
    fn coefficients(&self, side: Side, dx: Real) -> [Cplx; 3];

    /// Source of the boundary value
    fn source(&self) -> &ValueSource;
}

/// Fixed value: f = value
#[derive(Debug, Clone)]
pub struct Dirichlet {
    /// Value source
    pub value: ValueSource,
}

/// Fixed gradient, one-sided: df/dx = value
#[derive(Debug, Clone)]
pub struct Neumann {
    /// Value source
    pub value: ValueSource,
}

impl BoundaryRow for Dirichlet {
    fn coefficients(&self, _side: Side, _dx: Real) -> [Cplx; 3] {
        [Cplx::zero(), Cplx::one(), Cplx::zero()]
    }

    fn source(&self) -> &ValueSource {
        &self.value
    }
}

impl BoundaryRow for Neumann {
    fn coefficients(&self, side: Side, dx: Real) -> [Cplx; 3] {
        let g = Cplx::new(1. / dx, 0.);
        match side {
            Side::Inner => [Cplx::zero(), -g, g],
            Side::Outer => [-g, g, Cplx::zero()],
        }
    }

    fn source(&self) -> &ValueSource {
        &self.value
    }
}

/// Boundary operator, one of the closed set of kinds
#[enum_dispatch(BoundaryRow)]
#[derive(Debug, Clone)]
pub enum BoundaryOp {
    /// Fixed value
    Dirichlet,
    /// Fixed gradient
    Neumann,
}

/// Boundary treatment of one side, separate for the DC and the other modes
#[derive(Debug, Clone)]
pub struct SideBoundary {
    /// Operator of the DC (kz = 0) mode
    pub dc: BoundaryOp,
    /// Operator of all other modes
    pub ac: BoundaryOp,
}

impl SideBoundary {
    /// Operator of mode `kz`
    pub fn for_mode(&self, kz: usize) -> &BoundaryOp {
        if kz == 0 {
            &self.dc
        } else {
            &self.ac
        }
    }

    /// Prescribed values, if any
    pub fn set_value(&self) -> Option<&BoundaryValue> {
        match self.dc.source() {
            ValueSource::Set(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Partition;
    use ndarray::Array1;

    #[test]
    fn test_rows() {
        let dirichlet = BoundaryOp::from(Dirichlet {
            value: ValueSource::Zero,
        });
        let neumann = BoundaryOp::from(Neumann {
            value: ValueSource::Rhs,
        });
        let [a, b, c] = dirichlet.coefficients(Side::Outer, 0.5);
        assert_eq!((a, b, c), (Cplx::zero(), Cplx::one(), Cplx::zero()));
        let [a, b, c] = neumann.coefficients(Side::Inner, 0.5);
        assert_eq!(a, Cplx::zero());
        assert_eq!(b, Cplx::new(-2., 0.));
        assert_eq!(c, Cplx::new(2., 0.));
        let [a, b, c] = neumann.coefficients(Side::Outer, 0.5);
        assert_eq!(a, Cplx::new(-2., 0.));
        assert_eq!(b, Cplx::new(2., 0.));
        assert_eq!(c, Cplx::zero());
        assert!(matches!(neumann.source(), ValueSource::Rhs));
    }

    #[test]
    fn test_sample_values() {
        let part = Partition::for_rank(5, 1, 0, false).unwrap();
        let mesh = Mesh::uniform(part, 2, 5, 4., 4.).unwrap();
        let mut out = Array1::zeros(5);

        BoundaryValue::Constant(2.).sample(&mesh, 0., 0, &mut out.view_mut());
        assert!(out.iter().all(|v| (v - 2.).abs() < 1e-14));

        let gen = BoundaryValue::generator(|x, y, z| x + 10. * y + 100. * z);
        gen.sample(&mesh, 4., 1, &mut out.view_mut());
        assert!((out[2] - (4. + 10. + 200.)).abs() < 1e-12);

        let field = BoundaryValue::Field(Array2::from_shape_fn((2, 5), |(j, k)| (j * 5 + k) as f64));
        assert!(field.check(&mesh).is_ok());
        field.sample(&mesh, 0., 1, &mut out.view_mut());
        assert!((out[4] - 9.).abs() < 1e-14);
        assert!(BoundaryValue::Field(Array2::zeros((1, 5))).check(&mesh).is_err());
    }
}
