//! # Perpendicular slices and operator coefficients
//!
//! A [`FieldPerp`] holds the owned x rows of one y slice, including
//! the physical boundary rows, and all `ngz` points in z.
//!
//! [`Coefficient`]s enter the operator
//!
//!  ∇·(C ∇f) + A f = D rhs
//!
//! either as uniform scalars or sampled per point.
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::types::Real;
use ndarray::Array2;

/// Real field on a single y slice, indexed `[x_local, z]`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPerp {
    /// Values, shape `(n_local, ngz)`
    pub v: Array2<Real>,
    /// y index of the slice
    index: usize,
}

impl FieldPerp {
    /// New slice at y index `index`
    pub fn new(v: Array2<Real>, index: usize) -> Self {
        Self { v, index }
    }

    /// Slice of zeros, shaped after the mesh
    pub fn zeros(mesh: &Mesh, index: usize) -> Self {
        Self::new(Array2::zeros((mesh.n_local(), mesh.ngz)), index)
    }

    /// Slice filled by `f(x, z)` at the mesh coordinates
    pub fn from_fn<F: Fn(Real, Real) -> Real>(mesh: &Mesh, index: usize, f: F) -> Self {
        let v = Array2::from_shape_fn((mesh.n_local(), mesh.ngz), |(i, j)| {
            f(mesh.x[i], mesh.z(j))
        });
        Self::new(v, index)
    }

    /// y index of the slice
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check shape against the mesh
    ///
    /// # Errors
    /// If the shape is not `(n_local, ngz)` or the index is not a y slice.
    pub fn check(&self, mesh: &Mesh) -> Result<()> {
        let expected = [mesh.n_local(), mesh.ngz];
        if self.v.shape() != expected {
            return Err(Error::ShapeMismatch {
                what: "rhs slice",
                expected: expected.to_vec(),
                actual: self.v.shape().to_vec(),
            });
        }
        if self.index >= mesh.ny {
            return Err(Error::Config(format!(
                "slice index {} outside 0..{}",
                self.index, mesh.ny
            )));
        }
        Ok(())
    }
}

/// Coefficient of the elliptic operator
#[derive(Debug, Clone, PartialEq)]
pub enum Coefficient {
    /// Same value everywhere
    Scalar(Real),
    /// Value per x point and y slice, shape `(n_local + 2, ny)`:
    /// the owned rows plus one guard row on each side
    Field(Array2<Real>),
}

impl Coefficient {
    /// Value at owned row `ix` of slice `jy`
    pub fn at(&self, ix: usize, jy: usize) -> Real {
        match self {
            Self::Scalar(v) => *v,
            Self::Field(f) => f[[ix + 1, jy]],
        }
    }

    /// Values of the left and right neighbour of owned row `ix`
    pub fn neighbours(&self, ix: usize, jy: usize) -> (Real, Real) {
        match self {
            Self::Scalar(v) => (*v, *v),
            Self::Field(f) => (f[[ix, jy]], f[[ix + 2, jy]]),
        }
    }

    /// True for a uniform coefficient
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    fn check(&self, what: &'static str, mesh: &Mesh) -> Result<()> {
        match self {
            Self::Scalar(v) if v.is_finite() => Ok(()),
            Self::Scalar(v) => Err(Error::Config(format!("coefficient {} is {}", what, v))),
            Self::Field(f) => {
                let expected = [mesh.n_local() + 2, mesh.ny];
                if f.shape() == expected {
                    Ok(())
                } else {
                    Err(Error::ShapeMismatch {
                        what,
                        expected: expected.to_vec(),
                        actual: f.shape().to_vec(),
                    })
                }
            }
        }
    }
}

impl From<Real> for Coefficient {
    fn from(v: Real) -> Self {
        Self::Scalar(v)
    }
}

impl From<Array2<Real>> for Coefficient {
    fn from(f: Array2<Real>) -> Self {
        Self::Field(f)
    }
}

/// The coefficients A, C and D of one solve
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    /// Helmholtz term
    pub a: Coefficient,
    /// Weight inside the divergence
    pub c: Coefficient,
    /// Multiplies the right hand side
    pub d: Coefficient,
}

impl Default for Coefficients {
    /// Pure Laplacian: A = 0, C = 1, D = 1
    fn default() -> Self {
        Self {
            a: Coefficient::Scalar(0.),
            c: Coefficient::Scalar(1.),
            d: Coefficient::Scalar(1.),
        }
    }
}

impl Coefficients {
    /// Replace A
    pub fn with_a<T: Into<Coefficient>>(mut self, a: T) -> Self {
        self.a = a.into();
        self
    }

    /// Replace C
    pub fn with_c<T: Into<Coefficient>>(mut self, c: T) -> Self {
        self.c = c.into();
        self
    }

    /// Replace D
    pub fn with_d<T: Into<Coefficient>>(mut self, d: T) -> Self {
        self.d = d.into();
        self
    }

    /// Check field shapes against the mesh
    ///
    /// # Errors
    /// On a shape mismatch or a non-finite scalar.
    pub fn check(&self, mesh: &Mesh) -> Result<()> {
        self.a.check("A", mesh)?;
        self.c.check("C", mesh)?;
        self.d.check("D", mesh)
    }
}
