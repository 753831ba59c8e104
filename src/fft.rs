//! # Fourier transform along z
//!
//! Real rows of `ncz + 1` points (the last point repeats the first)
//! are transformed to `ncz / 2 + 1` complex amplitudes. The forward
//! transform is normalised, so mode 0 is the z average.
//!
//! With a shift angle `zshift`, mode k is rotated by `exp(-i k_z zshift)`
//! after the forward and by `exp(+i k_z zshift)` before the inverse
//! transform, where `k_z = k 2π / zlength`.
use crate::error::{Error, Result};
use crate::types::{Cplx, Real};
use ndarray::{ArrayBase, ArrayViewMut1, Data, Ix1};
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Planned real transform along z with owned scratch space
#[derive(Clone)]
pub struct ZFft {
    ncz: usize,
    nmode: usize,
    zlength: Real,
    fwd: Arc<dyn Fft<Real>>,
    bwd: Arc<dyn Fft<Real>>,
    buf: Vec<Cplx>,
    scratch: Vec<Cplx>,
}

impl fmt::Debug for ZFft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZFft")
            .field("ncz", &self.ncz)
            .field("nmode", &self.nmode)
            .field("zlength", &self.zlength)
            .finish()
    }
}

impl ZFft {
    /// Plan transforms for `ncz` independent points on a period of `zlength`
    ///
    /// # Errors
    /// If `ncz` is zero or `zlength` not positive.
    pub fn new(ncz: usize, zlength: Real) -> Result<Self> {
        if ncz == 0 || !(zlength > 0.) {
            return Err(Error::Config(format!(
                "invalid z transform: ncz={} zlength={}",
                ncz, zlength
            )));
        }
        let mut planner = FftPlanner::<Real>::new();
        let fwd = planner.plan_fft_forward(ncz);
        let bwd = planner.plan_fft_inverse(ncz);
        let scratch_len = fwd
            .get_inplace_scratch_len()
            .max(bwd.get_inplace_scratch_len());
        Ok(Self {
            ncz,
            nmode: ncz / 2 + 1,
            zlength,
            fwd,
            bwd,
            buf: vec![Cplx::zero(); ncz],
            scratch: vec![Cplx::zero(); scratch_len],
        })
    }

    /// Number of independent z points
    pub fn ncz(&self) -> usize {
        self.ncz
    }

    /// Number of retained modes
    pub fn nmode(&self) -> usize {
        self.nmode
    }

    /// Wave number of mode `kz`
    pub fn kwave(&self, kz: usize) -> Real {
        kz as Real * 2. * PI / self.zlength
    }

    fn phase(&self, kz: usize, zshift: Real) -> Cplx {
        Cplx::from_polar(1., self.kwave(kz) * zshift)
    }

    /// Forward transform of `row[..ncz]` into `out[..nmode]`
    ///
    /// # Panics
    /// If `row` has less than `ncz` or `out` less than `nmode` entries.
    pub fn forward<S: Data<Elem = Real>>(
        &mut self,
        row: &ArrayBase<S, Ix1>,
        zshift: Option<Real>,
        out: &mut ArrayViewMut1<Cplx>,
    ) {
        for (b, r) in self.buf.iter_mut().zip(row.iter()) {
            *b = Cplx::new(*r, 0.);
        }
        self.fwd.process_with_scratch(&mut self.buf, &mut self.scratch);
        let norm = 1. / self.ncz as Real;
        for kz in 0..self.nmode {
            let mut v = self.buf[kz] * norm;
            if let Some(shift) = zshift {
                v *= self.phase(kz, -shift);
            }
            out[kz] = v;
        }
    }

    /// Inverse transform of `modes[..nmode]` into `row[..=ncz]`.
    /// The closing point `row[ncz]` is a copy of `row[0]`.
    ///
    /// # Panics
    /// If `modes` has less than `nmode` or `row` less than `ncz + 1` entries.
    pub fn inverse<S: Data<Elem = Cplx>>(
        &mut self,
        modes: &ArrayBase<S, Ix1>,
        zshift: Option<Real>,
        row: &mut ArrayViewMut1<Real>,
    ) {
        let n = self.ncz;
        for kz in 0..self.nmode {
            let mut v = modes[kz];
            if let Some(shift) = zshift {
                v *= self.phase(kz, shift);
            }
            if kz == 0 || 2 * kz == n {
                // self-conjugate modes
                self.buf[kz] = Cplx::new(v.re, 0.);
            } else {
                self.buf[kz] = v;
                self.buf[n - kz] = v.conj();
            }
        }
        self.bwd.process_with_scratch(&mut self.buf, &mut self.scratch);
        for jz in 0..n {
            row[jz] = self.buf[jz].re;
        }
        row[n] = row[0];
    }
}
