// Copyright © 2024 Pathway

use nalgebra::{DMatrix, SymmetricEigen, SVD};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::error::{Error, Result};

#[derive(Clone, Copy, Debug)]
pub struct RandomizedSvdConfig {
    pub n_oversamples: usize,
    pub n_power_iterations: usize,
    pub random_state: u64,
}

impl Default for RandomizedSvdConfig {
    fn default() -> Self {
        Self {
            n_oversamples: 10,
            n_power_iterations: 5,
            random_state: 0,
        }
    }
}

/// Rank-`k` factorisation `a ≈ u · diag(s) · vt`, singular values descending.
#[derive(Clone, Debug)]
pub struct Svd {
    pub u: Array2<f64>,
    pub s: Array1<f64>,
    pub vt: Array2<f64>,
}

impl Svd {
    /// Scores of the rows of the factorised matrix, `u · diag(s)`.
    pub fn scores(&self) -> Array2<f64> {
        &self.u * &self.s
    }

    /// Makes the largest-magnitude entry of every `u` column positive.
    fn flip_signs(mut self) -> Self {
        for j in 0..self.s.len() {
            let pivot = self
                .u
                .column(j)
                .iter()
                .copied()
                .max_by(|x, y| x.abs().total_cmp(&y.abs()))
                .unwrap_or(0.0);
            if pivot < 0.0 {
                self.u.column_mut(j).mapv_inplace(|x| -x);
                self.vt.row_mut(j).mapv_inplace(|x| -x);
            }
        }
        self
    }
}

pub(crate) fn to_dmatrix(a: &ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn to_array(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Leading `k` singular triplets of `m`, unflipped.
fn leading_triplets(m: DMatrix<f64>, k: usize) -> Result<Svd> {
    let (rows, cols) = m.shape();
    if k > rows.min(cols) {
        return Err(Error::RankTooLow { rows, cols });
    }
    let svd = SVD::try_new(m, true, true, f64::EPSILON, 0)
        .ok_or(Error::NoConvergence("singular value decomposition"))?;
    let (Some(u), Some(vt)) = (svd.u, svd.v_t) else {
        return Err(Error::NoConvergence("singular value decomposition"));
    };
    let values = svd.singular_values;

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));
    order.truncate(k);

    Ok(Svd {
        u: Array2::from_shape_fn((rows, k), |(i, j)| u[(i, order[j])]),
        s: order.iter().map(|&i| values[i]).collect(),
        vt: Array2::from_shape_fn((k, cols), |(j, c)| vt[(order[j], c)]),
    })
}

/// Exact truncated SVD of `a` with `k` components (uncentered).
///
/// `k` must not exceed `min(a.nrows(), a.ncols())`. Component signs are
/// fixed so that the largest-magnitude entry of every `u` column is positive.
pub fn exact_svd(a: &ArrayView2<f64>, k: usize) -> Result<Svd> {
    Ok(leading_triplets(to_dmatrix(a), k)?.flip_signs())
}

/// Randomized truncated SVD of `a` with `k` components (uncentered).
///
/// The range of `a` is sketched with a seeded uniform test matrix and
/// refined by QR-stabilised power iterations before the small projected
/// problem is solved exactly. Deterministic for a given
/// `config.random_state`; signs follow [`exact_svd`].
pub fn randomized_svd(
    a: &ArrayView2<f64>,
    k: usize,
    config: &RandomizedSvdConfig,
) -> Result<Svd> {
    let (rows, cols) = a.dim();
    if k > rows.min(cols) {
        return Err(Error::RankTooLow { rows, cols });
    }
    let width = (k + config.n_oversamples).min(rows.min(cols));
    let a = to_dmatrix(a);

    let mut rng = StdRng::seed_from_u64(config.random_state);
    let omega = DMatrix::from_fn(cols, width, |_, _| rng.random_range(-1.0..1.0));
    let mut q = (&a * omega).qr().q();
    for _ in 0..config.n_power_iterations {
        let z = (a.transpose() * &q).qr().q();
        q = (&a * z).qr().q();
    }

    let projected = leading_triplets(q.transpose() * &a, k)?;
    Ok(Svd {
        u: to_array(&q).dot(&projected.u),
        ..projected
    }
    .flip_signs())
}

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues in descending order together with the matching
/// eigenvectors as columns.
pub fn symmetric_eigen(matrix: &ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let eigen = SymmetricEigen::try_new(to_dmatrix(matrix), f64::EPSILON, 0)
        .ok_or(Error::NoConvergence("symmetric eigendecomposition"))?;
    let values = eigen.eigenvalues;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));

    let vectors = to_array(&eigen.eigenvectors).select(Axis(1), &order);
    Ok((order.iter().map(|&i| values[i]).collect(), vectors))
}

/// Subtracts the column means of `a`, returning the centred copy.
pub fn center_columns(a: &ArrayView2<f64>) -> Array2<f64> {
    match a.mean_axis(Axis(0)) {
        Some(mean) => a - &mean,
        None => a.to_owned(),
    }
}
