//! # Mesh partition and geometry
//!
//! The x axis is distributed over a chain (or ring, if x is periodic)
//! of processors. Every processor owns a contiguous half-open range
//! `start..end` of global x indices. The first and last processor of
//! a non-periodic axis own the physical boundary rows.
//!
//! z is periodic with `ngz` points, the last of which repeats the first.
use crate::error::{Error, Result};
use crate::types::Real;
use ndarray::{s, Array1, Array2, ArrayBase, Data, Ix2};

/// Owned range of global x indices of one processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Global number of x points, including boundary rows
    pub nx: usize,
    /// Rank of the owning processor
    pub rank: usize,
    /// Number of processors along x
    pub nranks: usize,
    /// First owned global index
    pub start: usize,
    /// One past the last owned global index
    pub end: usize,
    /// x wraps around, no physical boundary
    pub periodic: bool,
}

impl Partition {
    /// Split `nx` points as evenly as possible over `nranks` processors.
    ///
    /// # Errors
    /// If a processor would own no point, or a non-periodic axis has
    /// less than three points (two boundaries plus one interior point).
    pub fn decompose(nx: usize, nranks: usize, periodic: bool) -> Result<Vec<Self>> {
        if nranks == 0 {
            return Err(Error::Partition("need at least one processor".into()));
        }
        let base = nx / nranks;
        let rem = nx % nranks;
        let mut ranges = Vec::with_capacity(nranks);
        let mut start = 0;
        for rank in 0..nranks {
            let len = base + usize::from(rank < rem);
            ranges.push((start, start + len));
            start += len;
        }
        Self::from_ranges(nx, &ranges, periodic)
    }

    /// Partition from explicit `(start, end)` ranges, one per rank.
    ///
    /// # Errors
    /// If the ranges are empty, overlap, leave gaps, or do not cover
    /// `0..nx` exactly once.
    pub fn from_ranges(nx: usize, ranges: &[(usize, usize)], periodic: bool) -> Result<Vec<Self>> {
        if ranges.is_empty() {
            return Err(Error::Partition("need at least one processor".into()));
        }
        if !periodic && nx < 3 {
            return Err(Error::Partition(format!(
                "non-periodic x needs at least 3 points, got {}",
                nx
            )));
        }
        let mut expected_start = 0;
        for (rank, &(start, end)) in ranges.iter().enumerate() {
            if start != expected_start {
                return Err(Error::Partition(format!(
                    "range of rank {} starts at {}, expected {}",
                    rank, start, expected_start
                )));
            }
            if end <= start {
                return Err(Error::Partition(format!(
                    "range of rank {} is empty ({}..{})",
                    rank, start, end
                )));
            }
            expected_start = end;
        }
        if expected_start != nx {
            return Err(Error::Partition(format!(
                "ranges cover 0..{}, but nx is {}",
                expected_start, nx
            )));
        }
        Ok(ranges
            .iter()
            .enumerate()
            .map(|(rank, &(start, end))| Self {
                nx,
                rank,
                nranks: ranges.len(),
                start,
                end,
                periodic,
            })
            .collect())
    }

    /// Partition of a single rank, see [`Partition::decompose`]
    ///
    /// # Errors
    /// See [`Partition::decompose`], or if `rank >= nranks`.
    pub fn for_rank(nx: usize, nranks: usize, rank: usize, periodic: bool) -> Result<Self> {
        Self::decompose(nx, nranks, periodic)?
            .into_iter()
            .nth(rank)
            .ok_or_else(|| Error::Partition(format!("rank {} not in 0..{}", rank, nranks)))
    }

    /// Number of owned points
    pub fn n_local(&self) -> usize {
        self.end - self.start
    }

    /// Owns the first global point
    pub fn first_x(&self) -> bool {
        self.start == 0
    }

    /// Owns the last global point
    pub fn last_x(&self) -> bool {
        self.end == self.nx
    }

    /// First owned row is the physical inner boundary
    pub fn inner_boundary(&self) -> bool {
        self.first_x() && !self.periodic
    }

    /// Last owned row is the physical outer boundary
    pub fn outer_boundary(&self) -> bool {
        self.last_x() && !self.periodic
    }

    /// Owned rows of a global `(nx, _)` array
    pub fn local<S: Data<Elem = Real>>(&self, global: &ArrayBase<S, Ix2>) -> Array2<Real> {
        global.slice(s![self.start..self.end, ..]).to_owned()
    }

    /// Owned rows of a global `(nx, _)` array plus one guard row on
    /// each side. Guard rows wrap around for periodic x and repeat the
    /// boundary row otherwise.
    pub fn local_with_guards<S: Data<Elem = Real>>(
        &self,
        global: &ArrayBase<S, Ix2>,
    ) -> Array2<Real> {
        let n = self.n_local();
        let nx = self.nx;
        let mut local = Array2::zeros((n + 2, global.ncols()));
        for (i, mut row) in local.outer_iter_mut().enumerate() {
            // global index of local row i is start + i - 1
            let ix = if i == 0 && self.start == 0 {
                if self.periodic {
                    nx - 1
                } else {
                    0
                }
            } else if self.start + i - 1 >= nx {
                if self.periodic {
                    0
                } else {
                    nx - 1
                }
            } else {
                self.start + i - 1
            };
            row.assign(&global.row(ix));
        }
        local
    }
}

/// Geometry of the processor-local part of the grid
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Owned x range
    pub partition: Partition,
    /// Number of y slices
    pub ny: usize,
    /// Number of z points, including the repeated periodic point
    pub ngz: usize,
    /// Length of the z domain (one period)
    pub zlength: Real,
    /// y spacing, only used for coordinates handed to boundary generators
    pub dy: Real,
    /// x coordinate of owned points
    pub x: Array1<Real>,
    /// Local x spacing of owned points
    pub dx: Array1<Real>,
    /// Metric component g^xx
    pub g11: Array1<Real>,
    /// Metric component g^zz
    pub g33: Array1<Real>,
    /// Metric component g^xz
    pub g13: Array1<Real>,
    /// Shift angle per owned point and y slice, `(n_local, ny)`
    pub zshift: Array2<Real>,
}

impl Mesh {
    /// Cartesian mesh with uniform spacing on `[0, lx]` in x.
    ///
    /// For periodic x the point `lx` is identified with `0`.
    ///
    /// # Errors
    /// On non-positive lengths, `ny == 0` or `ngz < 2`.
    pub fn uniform(
        partition: Partition,
        ny: usize,
        ngz: usize,
        lx: Real,
        zlength: Real,
    ) -> Result<Self> {
        if ngz < 2 {
            return Err(Error::Config(format!(
                "z needs at least 2 points (one plus the periodic copy), got {}",
                ngz
            )));
        }
        if ny == 0 {
            return Err(Error::Config("ny must be positive".into()));
        }
        if !(lx > 0.) || !(zlength > 0.) {
            return Err(Error::Config(format!(
                "domain lengths must be positive, got lx={} zlength={}",
                lx, zlength
            )));
        }
        let nx = partition.nx;
        let dx = if partition.periodic {
            lx / nx as Real
        } else {
            lx / (nx - 1) as Real
        };
        let n = partition.n_local();
        let x = Array1::from_iter((partition.start..partition.end).map(|i| i as Real * dx));
        Ok(Self {
            partition,
            ny,
            ngz,
            zlength,
            dy: 1.,
            x,
            dx: Array1::from_elem(n, dx),
            g11: Array1::ones(n),
            g33: Array1::ones(n),
            g13: Array1::zeros(n),
            zshift: Array2::zeros((n, ny)),
        })
    }

    /// Replace the metric components of the owned points
    ///
    /// # Errors
    /// If a component does not have `n_local` entries.
    pub fn with_metric(
        mut self,
        g11: Array1<Real>,
        g33: Array1<Real>,
        g13: Array1<Real>,
    ) -> Result<Self> {
        for (what, g) in [("g11", &g11), ("g33", &g33), ("g13", &g13)] {
            self.check_local(what, g.len())?;
        }
        self.g11 = g11;
        self.g33 = g33;
        self.g13 = g13;
        Ok(self)
    }

    /// Replace the local x spacing. Coordinates are left untouched.
    ///
    /// # Errors
    /// If `dx` does not have `n_local` entries or is not positive.
    pub fn with_dx(mut self, dx: Array1<Real>) -> Result<Self> {
        self.check_local("dx", dx.len())?;
        if dx.iter().any(|d| !(*d > 0.)) {
            return Err(Error::Config("x spacing must be positive".into()));
        }
        self.dx = dx;
        Ok(self)
    }

    /// Replace the shift angles, shape `(n_local, ny)`
    ///
    /// # Errors
    /// On shape mismatch.
    pub fn with_zshift(mut self, zshift: Array2<Real>) -> Result<Self> {
        let expected = [self.n_local(), self.ny];
        if zshift.shape() != expected {
            return Err(Error::ShapeMismatch {
                what: "zshift",
                expected: expected.to_vec(),
                actual: zshift.shape().to_vec(),
            });
        }
        self.zshift = zshift;
        Ok(self)
    }

    /// Check that the public geometry still agrees with the partition.
    ///
    /// # Errors
    /// If an array does not match `n_local`/`ny`, the grid is too small
    /// or a spacing is not positive.
    pub fn check(&self) -> Result<()> {
        if self.ngz < 2 || self.ny == 0 {
            return Err(Error::Config(format!(
                "mesh needs ny > 0 and ngz >= 2, got ny={} ngz={}",
                self.ny, self.ngz
            )));
        }
        for (what, len) in [
            ("x", self.x.len()),
            ("dx", self.dx.len()),
            ("g11", self.g11.len()),
            ("g33", self.g33.len()),
            ("g13", self.g13.len()),
        ] {
            self.check_local(what, len)?;
        }
        let expected = [self.n_local(), self.ny];
        if self.zshift.shape() != expected {
            return Err(Error::ShapeMismatch {
                what: "zshift",
                expected: expected.to_vec(),
                actual: self.zshift.shape().to_vec(),
            });
        }
        if self.dx.iter().any(|d| !(*d > 0.)) {
            return Err(Error::Config("x spacing must be positive".into()));
        }
        Ok(())
    }

    fn check_local(&self, what: &'static str, len: usize) -> Result<()> {
        if len == self.n_local() {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                what,
                expected: vec![self.n_local()],
                actual: vec![len],
            })
        }
    }

    /// Number of owned x points
    pub fn n_local(&self) -> usize {
        self.partition.n_local()
    }

    /// Number of independent z points
    pub fn ncz(&self) -> usize {
        self.ngz - 1
    }

    /// Number of retained Fourier modes in z
    pub fn nmode(&self) -> usize {
        self.ncz() / 2 + 1
    }

    /// z coordinate of point `jz`
    pub fn z(&self, jz: usize) -> Real {
        jz as Real * self.zlength / self.ncz() as Real
    }

    /// y coordinate of slice `jy`
    pub fn y(&self, jy: usize) -> Real {
        jy as Real * self.dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_is_contiguous() {
        let parts = Partition::decompose(11, 4, false).unwrap();
        let ranges: Vec<_> = parts.iter().map(|p| (p.start, p.end)).collect();
        assert_eq!(ranges, vec![(0, 3), (3, 6), (6, 9), (9, 11)]);
        assert!(parts[0].inner_boundary());
        assert!(!parts[0].outer_boundary());
        assert!(parts[3].outer_boundary());
        assert_eq!(parts[2].rank, 2);
        assert_eq!(parts[2].nranks, 4);
    }

    #[test]
    fn test_periodic_has_no_boundary() {
        let parts = Partition::decompose(8, 2, true).unwrap();
        assert!(parts[0].first_x());
        assert!(!parts[0].inner_boundary());
        assert!(!parts[1].outer_boundary());
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(Partition::from_ranges(10, &[(0, 4), (5, 10)], false).is_err());
        assert!(Partition::from_ranges(10, &[(0, 6), (5, 10)], false).is_err());
        assert!(Partition::from_ranges(10, &[(0, 4), (4, 9)], false).is_err());
        assert!(Partition::from_ranges(10, &[(0, 0), (0, 10)], false).is_err());
        assert!(Partition::decompose(3, 4, false).is_err());
        assert!(Partition::decompose(2, 1, false).is_err());
        assert!(Partition::for_rank(10, 2, 2, false).is_err());
    }

    #[test]
    fn test_local_with_guards() {
        let global = Array2::from_shape_fn((6, 2), |(i, j)| (10 * i + j) as f64);
        let parts = Partition::decompose(6, 2, false).unwrap();
        let first = parts[0].local_with_guards(&global);
        assert_eq!(first.column(0).to_vec(), vec![0., 0., 10., 20., 30.]);
        let last = parts[1].local_with_guards(&global);
        assert_eq!(last.column(0).to_vec(), vec![20., 30., 40., 50., 50.]);

        let parts = Partition::decompose(6, 2, true).unwrap();
        let first = parts[0].local_with_guards(&global);
        assert_eq!(first.column(1).to_vec(), vec![51., 1., 11., 21., 31.]);
        let last = parts[1].local_with_guards(&global);
        assert_eq!(last.column(1).to_vec(), vec![21., 31., 41., 51., 1.]);
    }

    #[test]
    fn test_uniform_mesh() {
        let part = Partition::for_rank(7, 2, 1, false).unwrap();
        let mesh = Mesh::uniform(part, 3, 9, 6., 2. * std::f64::consts::PI).unwrap();
        assert_eq!(mesh.n_local(), 3);
        assert_eq!(mesh.ncz(), 8);
        assert_eq!(mesh.nmode(), 5);
        assert!((mesh.dx[0] - 1.).abs() < 1e-14);
        assert!((mesh.x[0] - 4.).abs() < 1e-14);
        assert!(mesh.clone().with_zshift(Array2::zeros((3, 2))).is_err());
        assert!(mesh.with_dx(Array1::zeros(3)).is_err());
    }

    #[test]
    fn test_check_catches_edited_fields() {
        let part = Partition::for_rank(16, 2, 0, false).unwrap();
        let mesh = Mesh::uniform(part, 2, 5, 1., 1.).unwrap();
        assert!(mesh.check().is_ok());

        let mut bad = mesh.clone();
        bad.g11 = Array1::ones(3);
        assert!(matches!(
            bad.check(),
            Err(Error::ShapeMismatch { what: "g11", .. })
        ));
        let mut bad = mesh.clone();
        bad.zshift = Array2::zeros((8, 1));
        assert!(matches!(bad.check(), Err(Error::ShapeMismatch { .. })));
        let mut bad = mesh;
        bad.dx[2] = -1.;
        assert!(matches!(bad.check(), Err(Error::Config(_))));
    }
}
