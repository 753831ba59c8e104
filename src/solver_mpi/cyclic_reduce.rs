//! # Parallel cyclic reduction
//!
//! Solves `nsys` independent complex tridiagonal systems whose rows
//! are distributed over a chain (or ring) of processors. Processor `p`
//! owns `n` consecutive rows of every system, row `i` reads
//!
//!  a_i x_{i-1} + b_i x_i + c_i x_{i+1} = d_i
//!
//! where `x_{-1}` is the last unknown of the left and `x_n` the first
//! unknown of the right neighbour.
//!
//! # Description
//! 1. Local elimination: the first `n - 1` unknowns are expressed in
//!    the last unknown `X_{p-1}` of the left neighbour and the own last
//!    unknown `X_p`,
//!
//!     x_i = g_i + u_i X_{p-1} + v_i X_p
//!
//! 2. Interface exchange: with `(g_0, u_0, v_0)` of the right neighbour
//!    the own last row becomes one reduced row
//!
//!     L X_{p-1} + B X_p + R X_{p+1} = D
//!
//! 3. Cyclic reduction of the P reduced rows in rounds of distance
//!    1, 2, 4, .. < P. All systems travel in one message per round and
//!    direction. A ring is split into a chain plus a rank one
//!    correction (Sherman-Morrison), the chain is reduced with two
//!    right hand sides and the correction needs one group-wide sum.
//!
//! 4. Back substitution: `X_{p-1}` is received from the left neighbour.
//!
//! A single processor solves with the serial Thomas algorithm.
//!
//! Degenerate pivots are only recorded during the rounds. After the
//! last round all processors agree on the outcome, so either every
//! processor returns [`Error::DegeneratePivot`] or none does.
use crate::error::{Error, Result};
use crate::mpi::{Tag, Transport};
use crate::solver::tdma::{is_degenerate, tdma, tdma_cyclic};
use crate::types::{Cplx, Real};
use ndarray::prelude::*;
use ndarray::{Data, DataMut};
use num_traits::Zero;

const TAG_INTERFACE: Tag = 1;
const TAG_CORNER: Tag = 2;
const TAG_BACK: Tag = 3;
const TAG_PCR: Tag = 16;

// Columns of a reduced row
const L: usize = 0;
const B: usize = 1;
const R: usize = 2;
const D: usize = 3;
const D2: usize = 4;

/// Reduced row of a processor outside the chain
const IDENTITY: [Cplx; 5] = [
    Cplx::new(0., 0.),
    Cplx::new(1., 0.),
    Cplx::new(0., 0.),
    Cplx::new(0., 0.),
    Cplx::new(0., 0.),
];

/// Distributed tridiagonal solver for a batch of systems
#[derive(Debug)]
pub struct CyclicReduce<C> {
    comm: C,
    n: usize,
    nsys: usize,
    periodic: bool,
    /// Rows, shape `(nsys, n)`
    a: Array2<Cplx>,
    b: Array2<Cplx>,
    c: Array2<Cplx>,
    /// Pivots and modified super diagonal of the local elimination, `(nsys, n - 1)`
    piv: Array2<Cplx>,
    cp: Array2<Cplx>,
    /// Coupling of the local unknowns to the left and own interface unknown
    u: Array2<Cplx>,
    v: Array2<Cplx>,
    /// Particular solution of the local elimination
    g: Array2<Cplx>,
    coefs_set: bool,
    coefs_ok: bool,
    /// Reduced rows, columns L, B, R, D, D2
    rows: Array2<Cplx>,
    scale: Array1<Real>,
    /// Corner coupling over gamma of a ring, first processor only
    bg: Array1<Cplx>,
    /// Interface unknowns of the own and the left processor
    xp: Vec<Cplx>,
    xl: Vec<Cplx>,
    sendbuf: Vec<Cplx>,
    recv_lo: Vec<Cplx>,
    recv_hi: Vec<Cplx>,
    work: Array2<Cplx>,
}

impl<C: Transport> CyclicReduce<C> {
    /// Solver for `nsys` systems of which this processor owns `n` rows.
    ///
    /// # Errors
    /// If `n` or `nsys` is zero.
    pub fn new(comm: C, n: usize, nsys: usize, periodic: bool) -> Result<Self> {
        if n == 0 || nsys == 0 {
            return Err(Error::Config(format!(
                "cyclic reduction needs rows and systems, got n={} nsys={}",
                n, nsys
            )));
        }
        let m = n - 1;
        let nbuf = nsys * 5;
        tracing::debug!(
            rank = comm.rank(),
            nproc = comm.size(),
            n,
            nsys,
            periodic,
            "cyclic reduction set up"
        );
        Ok(Self {
            comm,
            n,
            nsys,
            periodic,
            a: Array2::zeros((nsys, n)),
            b: Array2::zeros((nsys, n)),
            c: Array2::zeros((nsys, n)),
            piv: Array2::zeros((nsys, m)),
            cp: Array2::zeros((nsys, m)),
            u: Array2::zeros((nsys, m)),
            v: Array2::zeros((nsys, m)),
            g: Array2::zeros((nsys, m)),
            coefs_set: false,
            coefs_ok: false,
            rows: Array2::zeros((nsys, 5)),
            scale: Array1::zeros(nsys),
            bg: Array1::zeros(nsys),
            xp: vec![Cplx::zero(); nsys],
            xl: vec![Cplx::zero(); nsys],
            sendbuf: vec![Cplx::zero(); nbuf],
            recv_lo: vec![Cplx::zero(); nbuf],
            recv_hi: vec![Cplx::zero(); nbuf],
            work: Array2::zeros((4, n)),
        })
    }

    /// Transport of the processor group
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Number of owned rows per system
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of systems
    pub fn nsys(&self) -> usize {
        self.nsys
    }

    fn nproc(&self) -> usize {
        self.comm.size()
    }

    fn rank(&self) -> usize {
        self.comm.rank()
    }

    fn left(&self) -> Option<usize> {
        let (rank, nproc) = (self.rank(), self.nproc());
        if rank > 0 {
            Some(rank - 1)
        } else if self.periodic {
            Some(nproc - 1)
        } else {
            None
        }
    }

    fn right(&self) -> Option<usize> {
        let (rank, nproc) = (self.rank(), self.nproc());
        if rank + 1 < nproc {
            Some(rank + 1)
        } else if self.periodic {
            Some(0)
        } else {
            None
        }
    }

    fn check_shape(&self, what: &'static str, shape: &[usize]) -> Result<()> {
        if shape == [self.nsys, self.n] {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                what,
                expected: vec![self.nsys, self.n],
                actual: shape.to_vec(),
            })
        }
    }

    /// Set the sub (`a`), main (`b`) and super (`c`) diagonal of all
    /// systems, each of shape `(nsys, n)`. Eliminates the local rows.
    ///
    /// `a[.., 0]` on the first and `c[.., n - 1]` on the last processor
    /// are ignored unless the systems are periodic.
    ///
    /// # Errors
    /// On shape mismatch.
    pub fn set_coefs<S1, S2, S3>(
        &mut self,
        a: &ArrayBase<S1, Ix2>,
        b: &ArrayBase<S2, Ix2>,
        c: &ArrayBase<S3, Ix2>,
    ) -> Result<()>
    where
        S1: Data<Elem = Cplx>,
        S2: Data<Elem = Cplx>,
        S3: Data<Elem = Cplx>,
    {
        self.check_shape("sub diagonal", a.shape())?;
        self.check_shape("main diagonal", b.shape())?;
        self.check_shape("super diagonal", c.shape())?;
        self.a.assign(a);
        self.b.assign(b);
        self.c.assign(c);
        self.coefs_set = true;
        self.coefs_ok = true;
        if self.nproc() == 1 {
            return Ok(());
        }

        let m = self.n - 1;
        let open_left = self.left().is_none();
        for k in 0..self.nsys {
            if m == 0 {
                continue;
            }
            let (a, b, c) = (self.a.row(k), self.b.row(k), self.c.row(k));
            let mut piv = self.piv.row_mut(k);
            let mut cp = self.cp.row_mut(k);
            piv[0] = b[0];
            self.coefs_ok &= !is_degenerate(piv[0], a[0].norm() + b[0].norm() + c[0].norm());
            for i in 1..m {
                cp[i - 1] = c[i - 1] / piv[i - 1];
                piv[i] = b[i] - a[i] * cp[i - 1];
                self.coefs_ok &=
                    !is_degenerate(piv[i], a[i].norm() + b[i].norm() + c[i].norm());
            }
            cp[m - 1] = c[m - 1] / piv[m - 1];

            let mut u = self.u.row_mut(k);
            u.fill(Cplx::zero());
            if !open_left {
                u[0] = -a[0];
            }
            sweep(a, piv.view(), cp.view(), u);

            let mut v = self.v.row_mut(k);
            v.fill(Cplx::zero());
            v[m - 1] = -c[m - 1];
            sweep(a, piv.view(), cp.view(), v);
        }
        Ok(())
    }

    /// Solve all systems for the right hand sides `rhs` into `x`, both
    /// of shape `(nsys, n)`.
    ///
    /// Must be called on every processor of the group.
    ///
    /// # Errors
    /// If [`CyclicReduce::set_coefs`] was never called, on shape
    /// mismatch (both before any communication), a failed exchange, or
    /// a degenerate pivot on any processor.
    pub fn solve<S1, S2>(
        &mut self,
        rhs: &ArrayBase<S1, Ix2>,
        x: &mut ArrayBase<S2, Ix2>,
    ) -> Result<()>
    where
        S1: Data<Elem = Cplx>,
        S2: Data<Elem = Cplx> + DataMut,
    {
        if !self.coefs_set {
            return Err(Error::Config("coefficients not set".into()));
        }
        self.check_shape("rhs", rhs.shape())?;
        self.check_shape("solution", x.shape())?;
        let _span = tracing::debug_span!(
            "cyclic_reduce",
            rank = self.rank(),
            nproc = self.nproc(),
            nsys = self.nsys
        )
        .entered();

        let ok = if self.nproc() == 1 {
            self.solve_serial(rhs, x)
        } else {
            let mut ok = self.coefs_ok;
            self.eliminate(rhs);
            self.exchange_interface()?;
            self.reduced_rows(rhs);
            let two_rhs = self.periodic;
            if two_rhs {
                self.remove_corners()?;
            }
            ok &= self.reduce(two_rhs)?;
            if two_rhs {
                ok &= self.correct_corners()?;
            }
            self.back_substitute(x)?;
            ok
        };

        let nproc = self.nproc();
        let flag = if ok { 0. } else { (nproc - self.rank()) as Real };
        let worst = self.comm.all_reduce_max(flag)?;
        if worst > 0. {
            let rank = nproc - worst as usize;
            tracing::warn!(rank, "degenerate pivot in tridiagonal solve");
            return Err(Error::DegeneratePivot { rank });
        }
        Ok(())
    }

    fn solve_serial<S1, S2>(&mut self, rhs: &ArrayBase<S1, Ix2>, x: &mut ArrayBase<S2, Ix2>) -> bool
    where
        S1: Data<Elem = Cplx>,
        S2: Data<Elem = Cplx> + DataMut,
    {
        let mut ok = true;
        for k in 0..self.nsys {
            let (a, b, c) = (self.a.row(k), self.b.row(k), self.c.row(k));
            ok &= if self.periodic {
                tdma_cyclic(a, b, c, rhs.row(k), x.row_mut(k), self.work.view_mut())
            } else {
                tdma(a, b, c, rhs.row(k), x.row_mut(k), self.work.row_mut(0))
            };
        }
        ok
    }

    /// Particular solutions `g` of the local rows
    fn eliminate<S: Data<Elem = Cplx>>(&mut self, rhs: &ArrayBase<S, Ix2>) {
        let m = self.n - 1;
        if m == 0 {
            return;
        }
        for k in 0..self.nsys {
            let mut g = self.g.row_mut(k);
            g.assign(&rhs.slice(s![k, ..m]));
            sweep(self.a.row(k), self.piv.row(k), self.cp.row(k), g);
        }
    }

    /// Send `(g_0, u_0, v_0)` to the left, receive those of the right neighbour
    fn exchange_interface(&mut self) -> Result<()> {
        let len = self.nsys * 3;
        for k in 0..self.nsys {
            let first = if self.n > 1 {
                [self.g[[k, 0]], self.u[[k, 0]], self.v[[k, 0]]]
            } else {
                // the only own unknown is the interface unknown
                [Cplx::zero(), Cplx::zero(), Cplx::new(1., 0.)]
            };
            self.sendbuf[3 * k..3 * k + 3].copy_from_slice(&first);
        }
        let (left, right) = (self.left(), self.right());
        if right.is_none() {
            self.recv_hi[..len].fill(Cplx::zero());
        }
        self.comm.exchange(
            TAG_INTERFACE,
            left,
            &self.sendbuf[..len],
            right,
            &mut self.recv_hi[..len],
        )
    }

    /// Own last row, with neighbours expressed in interface unknowns
    fn reduced_rows<S: Data<Elem = Cplx>>(&mut self, rhs: &ArrayBase<S, Ix2>) {
        let n = self.n;
        let open_left = self.left().is_none();
        let open_right = self.right().is_none();
        for k in 0..self.nsys {
            let (gl, ul, vl) = if n > 1 {
                (self.g[[k, n - 2]], self.u[[k, n - 2]], self.v[[k, n - 2]])
            } else {
                (Cplx::zero(), Cplx::new(1., 0.), Cplx::zero())
            };
            let an = if open_left && n == 1 {
                Cplx::zero()
            } else {
                self.a[[k, n - 1]]
            };
            let cn = if open_right {
                Cplx::zero()
            } else {
                self.c[[k, n - 1]]
            };
            let next = &self.recv_hi[3 * k..3 * k + 3];
            let (gr, ur, vr) = (next[0], next[1], next[2]);
            let row = [
                an * ul,
                self.b[[k, n - 1]] + an * vl + cn * ur,
                cn * vr,
                rhs[[k, n - 1]] - an * gl - cn * gr,
                Cplx::zero(),
            ];
            self.scale[k] = row[L].norm() + row[B].norm() + row[R].norm();
            self.rows.row_mut(k).assign(&ArrayView1::from(&row[..]));
        }
    }

    /// Split the ring coupling `L` of the first and `R` of the last
    /// processor into a rank one correction
    fn remove_corners(&mut self) -> Result<()> {
        let (rank, last) = (self.rank(), self.nproc() - 1);
        let len = self.nsys * 2;
        if rank == 0 {
            for k in 0..self.nsys {
                let mut row = self.rows.row_mut(k);
                let gamma = if row[B].norm() > 0. {
                    -row[B]
                } else {
                    Cplx::new(-1., 0.)
                };
                self.sendbuf[2 * k] = row[L];
                self.sendbuf[2 * k + 1] = gamma;
                self.bg[k] = row[L] / gamma;
                row[B] -= gamma;
                row[D2] = gamma;
                row[L] = Cplx::zero();
            }
        }
        self.comm.exchange(
            TAG_CORNER,
            if rank == 0 { Some(last) } else { None },
            &self.sendbuf[..len],
            if rank == last { Some(0) } else { None },
            &mut self.recv_lo[..len],
        )?;
        if rank == last {
            for k in 0..self.nsys {
                let (corner, gamma) = (self.recv_lo[2 * k], self.recv_lo[2 * k + 1]);
                let mut row = self.rows.row_mut(k);
                let r = row[R];
                row[B] -= r * corner / gamma;
                row[D2] = r;
                row[R] = Cplx::zero();
            }
        }
        Ok(())
    }

    /// Reduce the chain of reduced rows until every row is decoupled.
    /// Leaves the interface unknowns in `xp` (and the second solution in column `D2`).
    fn reduce(&mut self, two_rhs: bool) -> Result<bool> {
        let (rank, nproc) = (self.rank(), self.nproc());
        let ncol = if two_rhs { 5 } else { 4 };
        let len = self.nsys * ncol;
        let mut ok = true;
        let mut dist = 1;
        let mut round: Tag = 0;
        while dist < nproc {
            let lo = rank.checked_sub(dist);
            let hi = Some(rank + dist).filter(|&p| p < nproc);
            tracing::trace!(round, dist, ?lo, ?hi, "reduction round");

            for k in 0..self.nsys {
                for col in 0..ncol {
                    self.sendbuf[k * ncol + col] = self.rows[[k, col]];
                }
            }
            self.comm.exchange(
                TAG_PCR + 2 * round,
                hi,
                &self.sendbuf[..len],
                lo,
                &mut self.recv_lo[..len],
            )?;
            self.comm.exchange(
                TAG_PCR + 2 * round + 1,
                lo,
                &self.sendbuf[..len],
                hi,
                &mut self.recv_hi[..len],
            )?;

            for k in 0..self.nsys {
                let row_lo = match lo {
                    Some(_) => &self.recv_lo[k * ncol..(k + 1) * ncol],
                    None => &IDENTITY[..ncol],
                };
                let row_hi = match hi {
                    Some(_) => &self.recv_hi[k * ncol..(k + 1) * ncol],
                    None => &IDENTITY[..ncol],
                };
                let mut row = self.rows.row_mut(k);
                if !row[L].is_zero() {
                    ok &= !is_degenerate(row_lo[B], row_scale(row_lo));
                }
                if !row[R].is_zero() {
                    ok &= !is_degenerate(row_hi[B], row_scale(row_hi));
                }
                let alpha = -row[L] / row_lo[B];
                let beta = -row[R] / row_hi[B];
                row[B] += alpha * row_lo[R] + beta * row_hi[L];
                row[L] = alpha * row_lo[L];
                row[R] = beta * row_hi[R];
                for col in D..ncol {
                    row[col] += alpha * row_lo[col] + beta * row_hi[col];
                }
            }
            dist *= 2;
            round += 1;
        }

        for k in 0..self.nsys {
            let mut row = self.rows.row_mut(k);
            let bk = row[B];
            ok &= !is_degenerate(bk, self.scale[k]);
            self.xp[k] = row[D] / bk;
            if two_rhs {
                row[D2] /= bk;
            }
            ok &= self.xp[k].is_finite();
        }
        Ok(ok)
    }

    /// Apply the rank one correction of a ring. The first and last
    /// values of both chain solutions are summed over the group.
    fn correct_corners(&mut self) -> Result<bool> {
        let (rank, last) = (self.rank(), self.nproc() - 1);
        let len = self.nsys * 5;
        let corners = &mut self.sendbuf[..len];
        corners.fill(Cplx::zero());
        for k in 0..self.nsys {
            let z = self.rows[[k, D2]];
            if rank == 0 {
                corners[5 * k] = self.xp[k];
                corners[5 * k + 1] = z;
                corners[5 * k + 4] = self.bg[k];
            }
            if rank == last {
                corners[5 * k + 2] = self.xp[k];
                corners[5 * k + 3] = z;
            }
        }
        self.comm.all_reduce_sum(&mut self.sendbuf[..len])?;

        let mut ok = true;
        for k in 0..self.nsys {
            let s = &self.sendbuf[5 * k..5 * k + 5];
            let (y0, z0, yp, zp, bg) = (s[0], s[1], s[2], s[3], s[4]);
            let denom = Cplx::new(1., 0.) + z0 + bg * zp;
            ok &= !is_degenerate(denom, 1. + z0.norm() + (bg * zp).norm());
            let fact = (y0 + bg * yp) / denom;
            self.xp[k] -= fact * self.rows[[k, D2]];
        }
        Ok(ok)
    }

    /// Recover the local unknowns from the interface unknowns
    fn back_substitute<S: Data<Elem = Cplx> + DataMut>(
        &mut self,
        x: &mut ArrayBase<S, Ix2>,
    ) -> Result<()> {
        let nsys = self.nsys;
        let (left, right) = (self.left(), self.right());
        if left.is_none() {
            self.xl.fill(Cplx::zero());
        }
        self.comm
            .exchange(TAG_BACK, right, &self.xp, left, &mut self.xl)?;
        let m = self.n - 1;
        for k in 0..nsys {
            let (xl, xp) = (self.xl[k], self.xp[k]);
            for i in 0..m {
                x[[k, i]] = self.g[[k, i]] + self.u[[k, i]] * xl + self.v[[k, i]] * xp;
            }
            x[[k, m]] = xp;
        }
        Ok(())
    }
}

fn row_scale(row: &[Cplx]) -> Real {
    row[L].norm() + row[B].norm() + row[R].norm()
}

/// Forward elimination and back substitution with precomputed pivots.
/// `y` holds the right hand side on entry and the solution on exit.
fn sweep(a: ArrayView1<Cplx>, piv: ArrayView1<Cplx>, cp: ArrayView1<Cplx>, mut y: ArrayViewMut1<Cplx>) {
    let m = y.len();
    y[0] = y[0] / piv[0];
    for i in 1..m {
        y[i] = (y[i] - a[i] * y[i - 1]) / piv[i];
    }
    for i in (0..m - 1).rev() {
        y[i] = y[i] - cp[i] * y[i + 1];
    }
}
