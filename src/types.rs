//! Types and traits for real and complex numbers
use num_complex::Complex;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

/// Real type, used for all physical quantities
pub type Real = f64;

/// Complex type, used for spectral amplitudes and tridiagonal coefficients
pub type Cplx = Complex<Real>;

/// Scalar type of the tridiagonal solvers
pub trait Scalar:
    num_traits::Zero
    + num_traits::One
    + Copy
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
    + SubAssign
    + AddAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
{
    /// Magnitude, used for pivot checks
    fn magnitude(&self) -> Real;
}

impl Scalar for Real {
    fn magnitude(&self) -> Real {
        self.abs()
    }
}

impl Scalar for Cplx {
    fn magnitude(&self) -> Real {
        self.norm()
    }
}
