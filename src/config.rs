//! # Solver configuration
//!
//! Boundary flags and prescribed values are fixed when the solver is
//! constructed. Only the coefficients A, C and D change between calls.
use crate::boundary::{BoundaryOp, BoundaryValue, Dirichlet, Neumann, SideBoundary, ValueSource};
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of inversion flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InvertFlags(u32);

impl InvertFlags {
    /// Dirichlet zero on both sides, all modes solved
    pub const NONE: Self = Self(0);
    /// Neumann condition for the DC mode at the inner boundary
    pub const DC_INNER_GRAD: Self = Self(1);
    /// Neumann condition for the non-DC modes at the inner boundary
    pub const AC_INNER_GRAD: Self = Self(1 << 1);
    /// Neumann condition for the DC mode at the outer boundary
    pub const DC_OUTER_GRAD: Self = Self(1 << 2);
    /// Neumann condition for the non-DC modes at the outer boundary
    pub const AC_OUTER_GRAD: Self = Self(1 << 3);
    /// Force the DC mode of the solution to zero
    pub const ZERO_DC: Self = Self(1 << 4);
    /// Inner boundary value from the boundary row of the rhs
    pub const INNER_RHS: Self = Self(1 << 5);
    /// Outer boundary value from the boundary row of the rhs
    pub const OUTER_RHS: Self = Self(1 << 6);
    /// Inner boundary value from the configured value source
    pub const INNER_SET: Self = Self(1 << 7);
    /// Outer boundary value from the configured value source
    pub const OUTER_SET: Self = Self(1 << 8);

    const ALL: u32 = (1 << 9) - 1;
    const BOUNDARY: u32 = Self::ALL & !Self::ZERO_DC.0;

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Flags from raw bits
    ///
    /// # Errors
    /// If unknown bits are set.
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits & !Self::ALL == 0 {
            Ok(Self(bits))
        } else {
            Err(Error::Config(format!("unknown inversion flags {:#x}", bits)))
        }
    }

    /// All flags of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn any_boundary(self) -> bool {
        self.0 & Self::BOUNDARY != 0
    }
}

impl BitOr for InvertFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for InvertFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Immutable configuration of a [`LaplaceCyclic`](crate::solver::LaplaceCyclic) solver
#[derive(Debug, Clone, Default)]
pub struct LaplaceConfig {
    /// Boundary and mode flags
    pub flags: InvertFlags,
    /// Prescribed inner boundary values, requires [`InvertFlags::INNER_SET`]
    pub inner_value: Option<BoundaryValue>,
    /// Prescribed outer boundary values, requires [`InvertFlags::OUTER_SET`]
    pub outer_value: Option<BoundaryValue>,
    /// Apply the per-row z shift in the transforms
    pub shift_x_derivs: bool,
    /// Highest mode that is solved, higher modes are set to zero
    pub max_mode: Option<usize>,
}

impl LaplaceConfig {
    /// Configuration with flags and default everything else
    pub fn new(flags: InvertFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    /// Prescribe inner boundary values
    pub fn with_inner_value(mut self, value: BoundaryValue) -> Self {
        self.inner_value = Some(value);
        self
    }

    /// Prescribe outer boundary values
    pub fn with_outer_value(mut self, value: BoundaryValue) -> Self {
        self.outer_value = Some(value);
        self
    }

    /// Enable the z shift in the transforms
    pub fn with_shift(mut self, shift_x_derivs: bool) -> Self {
        self.shift_x_derivs = shift_x_derivs;
        self
    }

    /// Solve only modes `0..=max_mode`
    pub fn with_max_mode(mut self, max_mode: usize) -> Self {
        self.max_mode = Some(max_mode);
        self
    }

    /// Check the configuration against the mesh
    ///
    /// # Errors
    /// On conflicting or incomplete flags, see [`LaplaceConfig::boundaries`].
    pub fn validate(&self, mesh: &Mesh) -> Result<()> {
        if let Some(m) = self.max_mode {
            if m >= mesh.nmode() {
                return Err(Error::Config(format!(
                    "max_mode {} exceeds the highest mode {}",
                    m,
                    mesh.nmode() - 1
                )));
            }
        }
        if mesh.partition.periodic {
            if self.flags.any_boundary() || self.inner_value.is_some() || self.outer_value.is_some()
            {
                return Err(Error::Config(
                    "boundary flags or values given, but x is periodic".into(),
                ));
            }
            return Ok(());
        }
        for value in self.inner_value.iter().chain(self.outer_value.iter()) {
            value.check(mesh)?;
        }
        self.boundaries().map(|_| ())
    }

    /// Boundary operators of the inner and outer side
    ///
    /// # Errors
    /// If a value is requested from both the rhs and a prescribed
    /// source, a prescribed source is missing, or a prescribed value
    /// is given without the flag that selects it.
    pub fn boundaries(&self) -> Result<(SideBoundary, SideBoundary)> {
        let f = self.flags;
        let inner = side(
            "inner",
            f.contains(InvertFlags::DC_INNER_GRAD),
            f.contains(InvertFlags::AC_INNER_GRAD),
            f.contains(InvertFlags::INNER_RHS),
            f.contains(InvertFlags::INNER_SET),
            &self.inner_value,
        )?;
        let outer = side(
            "outer",
            f.contains(InvertFlags::DC_OUTER_GRAD),
            f.contains(InvertFlags::AC_OUTER_GRAD),
            f.contains(InvertFlags::OUTER_RHS),
            f.contains(InvertFlags::OUTER_SET),
            &self.outer_value,
        )?;
        Ok((inner, outer))
    }

    /// Highest solved mode
    pub fn max_mode(&self, nmode: usize) -> usize {
        self.max_mode.unwrap_or(nmode - 1)
    }
}

fn side(
    name: &str,
    grad_dc: bool,
    grad_ac: bool,
    from_rhs: bool,
    from_set: bool,
    value: &Option<BoundaryValue>,
) -> Result<SideBoundary> {
    let source = match (from_rhs, from_set, value) {
        (false, false, None) => ValueSource::Zero,
        (true, false, None) => ValueSource::Rhs,
        (false, true, Some(v)) => ValueSource::Set(v.clone()),
        (true, true, _) => {
            return Err(Error::Config(format!(
                "{} boundary value requested from rhs and from a set value",
                name
            )))
        }
        (_, true, None) => {
            return Err(Error::Config(format!(
                "{} boundary value flagged as set, but no value given",
                name
            )))
        }
        (_, false, Some(_)) => {
            return Err(Error::Config(format!(
                "{} boundary value given, but not selected by flags",
                name
            )))
        }
    };
    let op = |grad: bool| -> BoundaryOp {
        if grad {
            Neumann {
                value: source.clone(),
            }
            .into()
        } else {
            Dirichlet {
                value: source.clone(),
            }
            .into()
        }
    };
    Ok(SideBoundary {
        dc: op(grad_dc),
        ac: op(grad_ac),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryRow;
    use crate::mesh::Partition;

    fn mesh(periodic: bool) -> Mesh {
        let part = Partition::for_rank(8, 1, 0, periodic).unwrap();
        Mesh::uniform(part, 1, 9, 1., 1.).unwrap()
    }

    #[test]
    fn test_flags() {
        let f = InvertFlags::DC_INNER_GRAD | InvertFlags::ZERO_DC;
        assert!(f.contains(InvertFlags::ZERO_DC));
        assert!(!f.contains(InvertFlags::AC_INNER_GRAD));
        assert_eq!(InvertFlags::from_bits(f.bits()).unwrap(), f);
        assert!(InvertFlags::from_bits(1 << 20).is_err());
        assert!(!InvertFlags::ZERO_DC.any_boundary());
    }

    #[test]
    fn test_default_is_dirichlet_zero() {
        let (inner, outer) = LaplaceConfig::default().boundaries().unwrap();
        assert!(matches!(inner.dc, BoundaryOp::Dirichlet(_)));
        assert!(matches!(outer.ac, BoundaryOp::Dirichlet(_)));
        assert!(matches!(inner.ac.source(), ValueSource::Zero));
    }

    #[test]
    fn test_neumann_per_mode() {
        let flags = InvertFlags::DC_INNER_GRAD | InvertFlags::AC_OUTER_GRAD | InvertFlags::OUTER_RHS;
        let (inner, outer) = LaplaceConfig::new(flags).boundaries().unwrap();
        assert!(matches!(inner.for_mode(0), BoundaryOp::Neumann(_)));
        assert!(matches!(inner.for_mode(3), BoundaryOp::Dirichlet(_)));
        assert!(matches!(outer.for_mode(0), BoundaryOp::Dirichlet(_)));
        assert!(matches!(outer.for_mode(1), BoundaryOp::Neumann(_)));
        assert!(matches!(outer.dc.source(), ValueSource::Rhs));
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        let mesh = mesh(false);
        let both = LaplaceConfig::new(InvertFlags::INNER_RHS | InvertFlags::INNER_SET)
            .with_inner_value(BoundaryValue::Constant(1.));
        assert!(matches!(both.validate(&mesh), Err(Error::Config(_))));
        let missing = LaplaceConfig::new(InvertFlags::OUTER_SET);
        assert!(missing.validate(&mesh).is_err());
        let unused = LaplaceConfig::default().with_outer_value(BoundaryValue::Constant(1.));
        assert!(unused.validate(&mesh).is_err());
        let ok = LaplaceConfig::new(InvertFlags::OUTER_SET)
            .with_outer_value(BoundaryValue::Constant(1.));
        assert!(ok.validate(&mesh).is_ok());
    }

    #[test]
    fn test_periodic_rejects_boundaries() {
        let mesh = mesh(true);
        assert!(LaplaceConfig::default().validate(&mesh).is_ok());
        assert!(LaplaceConfig::new(InvertFlags::ZERO_DC).validate(&mesh).is_ok());
        assert!(LaplaceConfig::new(InvertFlags::AC_INNER_GRAD)
            .validate(&mesh)
            .is_err());
    }

    #[test]
    fn test_max_mode() {
        let mesh = mesh(false);
        assert!(LaplaceConfig::default().with_max_mode(4).validate(&mesh).is_ok());
        assert!(LaplaceConfig::default().with_max_mode(5).validate(&mesh).is_err());
        assert_eq!(LaplaceConfig::default().max_mode(5), 4);
    }
}
