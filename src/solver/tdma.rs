//! Tridiagonal matrix solver (Thomas algorithm)
//!
//! Open systems are solved by forward elimination and back
//! substitution. Periodic systems carry two corner entries and are
//! reduced to two open solves (Sherman-Morrison).
use super::diag;
use crate::error::{Error, Result};
use crate::types::{Real, Scalar};
use ndarray::prelude::*;
use ndarray::{Data, DataMut};

/// Relative magnitude below which a pivot counts as zero
pub const PIVOT_TOL: Real = 1e-12;

/// True if `pivot` is negligible compared to the magnitude `scale` of its row
pub fn is_degenerate<T: Scalar>(pivot: T, scale: Real) -> bool {
    let p = pivot.magnitude();
    // also true for NaN
    !(p > PIVOT_TOL * scale)
}

/// Solve tridiagonal system with diagonals-offsets: -1, 0, 1
///
/// For periodic systems `low[0]` is the entry in the upper right
/// corner and `upp[n-1]` the entry in the lower left corner. Otherwise
/// both are ignored.
#[derive(Debug, Clone)]
pub struct Tdma<T> {
    /// Size of matrix (= size of main diagonal)
    pub n: usize,
    /// Lower diagonal (-1), `low[i]` belongs to row i
    pub low: Array1<T>,
    /// Main diagonal
    pub dia: Array1<T>,
    /// Upper diagonal (+1), `upp[i]` belongs to row i
    pub upp: Array1<T>,
    /// Rows wrap around
    pub periodic: bool,
}

impl<T: Scalar> Tdma<T> {
    /// Initialize Tdma from matrix.
    /// Extracts the diagonals, corner entries are taken if `periodic`.
    pub fn from_matrix(a: &Array2<T>, periodic: bool) -> Self {
        let n = a.nrows();
        let mut low = Array1::zeros(n);
        let mut upp = Array1::zeros(n);
        low.slice_mut(s![1..]).assign(&diag(a, -1));
        upp.slice_mut(s![..n - 1]).assign(&diag(a, 1));
        if periodic && n > 1 {
            low[0] = a[[0, n - 1]];
            upp[n - 1] = a[[n - 1, 0]];
        }
        Self {
            n,
            low,
            dia: diag(a, 0),
            upp,
            periodic,
        }
    }

    /// Initialize Tdma from diagonals, all of length n
    ///
    /// # Panics
    /// If the diagonals differ in length.
    pub fn from_diags(low: Array1<T>, dia: Array1<T>, upp: Array1<T>, periodic: bool) -> Self {
        assert!(
            low.len() == dia.len() && upp.len() == dia.len(),
            "Tdma: diagonals must have equal length"
        );
        Self {
            n: dia.len(),
            low,
            dia,
            upp,
            periodic,
        }
    }

    /// Dense matrix, including corner entries of periodic systems
    pub fn to_matrix(&self) -> Array2<T> {
        let n = self.n;
        let mut m = Array2::zeros((n, n));
        for i in 0..n {
            m[[i, i]] += self.dia[i];
            if i > 0 {
                m[[i, i - 1]] += self.low[i];
            } else if self.periodic {
                m[[0, n - 1]] += self.low[0];
            }
            if i + 1 < n {
                m[[i, i + 1]] += self.upp[i];
            } else if self.periodic {
                m[[n - 1, 0]] += self.upp[n - 1];
            }
        }
        m
    }

    /// Solves M x = b
    ///
    /// # Errors
    /// On a degenerate pivot.
    pub fn solve<S1, S2>(&self, input: &ArrayBase<S1, Ix1>, output: &mut ArrayBase<S2, Ix1>) -> Result<()>
    where
        S1: Data<Elem = T>,
        S2: Data<Elem = T> + DataMut,
    {
        let mut work = Array2::zeros((4, self.n));
        let ok = if self.periodic {
            tdma_cyclic(
                self.low.view(),
                self.dia.view(),
                self.upp.view(),
                input.view(),
                output.view_mut(),
                work.view_mut(),
            )
        } else {
            tdma(
                self.low.view(),
                self.dia.view(),
                self.upp.view(),
                input.view(),
                output.view_mut(),
                work.row_mut(0),
            )
        };
        if ok {
            Ok(())
        } else {
            Err(Error::DegeneratePivot { rank: 0 })
        }
    }
}

/// Thomas algorithm for an open system.
///
/// `work` holds the modified upper diagonal. Returns false if a pivot
/// is degenerate, in which case `x` is unusable.
#[allow(clippy::many_single_char_names)]
pub fn tdma<T: Scalar>(
    low: ArrayView1<T>,
    dia: ArrayView1<T>,
    upp: ArrayView1<T>,
    rhs: ArrayView1<T>,
    mut x: ArrayViewMut1<T>,
    mut work: ArrayViewMut1<T>,
) -> bool {
    let n = dia.len();
    let mut ok = true;
    let mut piv = dia[0];
    ok &= !is_degenerate(piv, dia[0].magnitude() + upp[0].magnitude());
    x[0] = rhs[0] / piv;
    for i in 1..n {
        work[i] = upp[i - 1] / piv;
        piv = dia[i] - low[i] * work[i];
        let scale = low[i].magnitude() + dia[i].magnitude() + upp[i].magnitude();
        ok &= !is_degenerate(piv, scale);
        x[i] = (rhs[i] - low[i] * x[i - 1]) / piv;
    }
    for i in (0..n - 1).rev() {
        let xi = x[i] - work[i + 1] * x[i + 1];
        x[i] = xi;
    }
    ok
}

/// Thomas algorithm for a periodic system, see [`Tdma`] for the
/// location of the corner entries.
///
/// `work` must have shape `(4, n)`. Returns false if a pivot is degenerate.
#[allow(clippy::many_single_char_names)]
pub fn tdma_cyclic<T: Scalar>(
    low: ArrayView1<T>,
    dia: ArrayView1<T>,
    upp: ArrayView1<T>,
    rhs: ArrayView1<T>,
    mut x: ArrayViewMut1<T>,
    work: ArrayViewMut2<T>,
) -> bool {
    let n = dia.len();
    if n == 1 {
        // the single unknown is its own neighbour on both sides
        let piv = low[0] + dia[0] + upp[0];
        x[0] = rhs[0] / piv;
        let scale = low[0].magnitude() + dia[0].magnitude() + upp[0].magnitude();
        return !is_degenerate(piv, scale);
    }
    let (w, rest) = work.split_at(Axis(0), 1);
    let (mut bb, rest) = rest.split_at(Axis(0), 1);
    let (mut u, mut z) = rest.split_at(Axis(0), 1);
    let alpha = upp[n - 1];
    let beta = low[0];
    let gamma = if dia[0].magnitude() > 0. {
        T::zero() - dia[0]
    } else {
        T::zero() - T::one()
    };

    // Remove corners: A = T + u v^T with u = (gamma, 0, .., alpha), v = (1, 0, .., beta/gamma)
    bb.assign(&dia.insert_axis(Axis(0)));
    bb[[0, 0]] = dia[0] - gamma;
    bb[[0, n - 1]] = dia[n - 1] - alpha * beta / gamma;
    u.fill(T::zero());
    u[[0, 0]] = gamma;
    u[[0, n - 1]] = alpha;

    let mut w = w.index_axis_move(Axis(0), 0);
    let bb = bb.index_axis(Axis(0), 0);
    let mut ok = tdma(low, bb, upp, rhs, x.view_mut(), w.view_mut());
    ok &= tdma(
        low,
        bb,
        upp,
        u.index_axis(Axis(0), 0),
        z.index_axis_mut(Axis(0), 0),
        w,
    );
    let z = z.index_axis(Axis(0), 0);

    let bg = beta / gamma;
    let denom = T::one() + z[0] + bg * z[n - 1];
    ok &= !is_degenerate(denom, 1. + z[0].magnitude() + (bg * z[n - 1]).magnitude());
    let fact = (x[0] + bg * x[n - 1]) / denom;
    for i in 0..n {
        let xi = x[i] - fact * z[i];
        x[i] = xi;
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cplx;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn approx_eq_complex<S, D>(result: &ArrayBase<S, D>, expected: &ArrayBase<S, D>)
    where
        S: Data<Elem = Cplx>,
        D: Dimension,
    {
        let dif = 1e-10;
        for (a, b) in expected.iter().zip(result.iter()) {
            if (a.re - b.re).abs() > dif || (a.im - b.im).abs() > dif {
                panic!("Large difference of values, got {} expected {}.", b, a)
            }
        }
    }

    fn random_system(n: usize, periodic: bool) -> Tdma<Cplx> {
        let dist = Uniform::new(-1., 1.);
        let re = Array2::random((3, n), dist);
        let im = Array2::random((3, n), dist);
        let diags = Array2::from_shape_fn((3, n), |(d, i)| Cplx::new(re[[d, i]], im[[d, i]]));
        // diagonally dominant
        let dia = Array1::from_shape_fn(n, |i| {
            diags[[1, i]] + Cplx::new(3. * diags[[1, i]].re.signum(), 0.)
        });
        Tdma::from_diags(diags.row(0).to_owned(), dia, diags.row(2).to_owned(), periodic)
    }

    #[test]
    fn test_tdma_dim1() {
        let nx = 6;
        let mut data = Array1::<f64>::zeros(nx);
        let mut result = Array1::<f64>::zeros(nx);
        let mut matrix = Array2::<f64>::zeros((nx, nx));
        for (i, v) in data.iter_mut().enumerate() {
            *v = i as f64;
        }
        for i in 0..nx {
            let j = (i + 1) as f64;
            matrix[[i, i]] = 4. * j;
            if i > 0 {
                matrix[[i, i - 1]] = 1.5 * j;
            }
            if i < nx - 1 {
                matrix[[i, i + 1]] = -0.5 * j;
            }
        }
        let solver = Tdma::from_matrix(&matrix, false);
        solver.solve(&data, &mut result).unwrap();
        let recover: Array1<f64> = matrix.dot(&result);
        for (a, b) in recover.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-12, "got {} expected {}", a, b);
        }
    }

    #[test]
    fn test_tdma_complex() {
        for n in [1, 2, 5, 17] {
            let solver = random_system(n, false);
            let data = Array1::from_shape_fn(n, |i| Cplx::new(i as f64, 1. - i as f64));
            let mut result = Array1::zeros(n);
            solver.solve(&data, &mut result).unwrap();
            approx_eq_complex(&solver.to_matrix().dot(&result), &data);
        }
    }

    #[test]
    fn test_tdma_cyclic() {
        for n in [1, 2, 3, 8, 13] {
            let solver = random_system(n, true);
            let data = Array1::from_shape_fn(n, |i| Cplx::new(1., i as f64));
            let mut result = Array1::zeros(n);
            solver.solve(&data, &mut result).unwrap();
            approx_eq_complex(&solver.to_matrix().dot(&result), &data);
        }
    }

    #[test]
    fn test_singular_system() {
        // Neumann-Neumann laplacian, constants are in the null space
        let n = 6;
        let mut low = Array1::from_elem(n, 1.);
        let mut dia = Array1::from_elem(n, -2.);
        let mut upp = Array1::from_elem(n, 1.);
        low[0] = 0.;
        dia[0] = -1.;
        dia[n - 1] = 1.;
        low[n - 1] = -1.;
        upp[n - 1] = 0.;
        let solver = Tdma::from_diags(low, dia, upp, false);
        let mut result = Array1::zeros(n);
        let res = solver.solve(&Array1::zeros(n), &mut result);
        assert!(matches!(res, Err(Error::DegeneratePivot { rank: 0 })));

        // periodic laplacian
        let solver = Tdma::from_diags(
            Array1::from_elem(n, 1.),
            Array1::from_elem(n, -2.),
            Array1::from_elem(n, 1.),
            true,
        );
        let res = solver.solve(&Array1::zeros(n), &mut result);
        assert!(res.is_err());
    }
}
