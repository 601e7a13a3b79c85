//! # Sampler
//!
//! Multivariate-normal sampling from a coefficient posterior described by
//! its mean and precision (inverse covariance). Each batch unit is factored
//! and sampled independently: the precision is Cholesky-decomposed as
//! `L · Lᵀ`, standard-normal draws are pushed through the triangular solve
//! `L · S = Z`, and the posterior mean is added per column.
//!
//! Randomness is injected through a caller-supplied `rand::Rng`, so a
//! seeded `StdRng` gives fully deterministic draws and concurrent callers
//! can hand each worker its own generator.

use faer::Mat;
use rand::Rng;
use rand_distr::StandardNormal;
use thiserror::Error;

use crate::matrix_ops::{cholesky_lower, forward_substitute, matrix_is_finite};

/// Errors returned by posterior sampling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SamplerError {
    #[error("sample count must be positive")]
    InvalidSampleCount,
    #[error("single-unit mean must be a non-empty single column matrix")]
    MeanNotColumn,
    #[error("batch means must have at least one unit and one coefficient")]
    EmptyMeans,
    #[error(
        "precision matrix must be {coefficients} x {coefficients}, got {rows} x {cols}"
    )]
    PrecisionShapeMismatch {
        coefficients: usize,
        rows: usize,
        cols: usize,
    },
    #[error("means hold {units} units but {precisions} precision matrices were supplied")]
    BatchSizeMismatch { units: usize, precisions: usize },
    #[error("batch unit {unit}: precision matrix contains non-finite values")]
    NonFinitePrecision { unit: usize },
    #[error("batch unit {unit}: precision matrix is not positive definite")]
    NotPositiveDefinite { unit: usize },
}

/// Draws `n_samples` posterior samples for a single unit.
///
/// `mean` is `coefficients x 1`, `precision` is a symmetric
/// positive-definite `coefficients x coefficients` matrix, and the returned
/// matrix is `coefficients x n_samples` with each column distributed as
/// `N(mean, precision⁻¹)`.
///
/// # Errors
///
/// Returns `SamplerError` if `n_samples` is zero, shapes are inconsistent,
/// or the precision matrix is non-finite or not positive-definite.
///
/// # Examples
///
/// ```
/// use faer::Mat;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use bayes_linear::sample_posterior;
///
/// let mean = Mat::from_fn(2, 1, |i, _| if i == 0 { 1.0 } else { 2.0 });
/// let precision = Mat::from_fn(2, 2, |i, j| match (i, j) {
///     (0, 0) => 10.0,
///     (1, 1) => 20.0,
///     _ => 1.0,
/// });
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let samples = sample_posterior(&mean, &precision, 16, &mut rng).unwrap();
/// assert_eq!(samples.nrows(), 2);
/// assert_eq!(samples.ncols(), 16);
/// ```
pub fn sample_posterior<R: Rng>(
    mean: &Mat<f64>,
    precision: &Mat<f64>,
    n_samples: usize,
    rng: &mut R,
) -> Result<Mat<f64>, SamplerError> {
    if mean.ncols() != 1 || mean.nrows() == 0 {
        return Err(SamplerError::MeanNotColumn);
    }
    let means = Mat::from_fn(1, mean.nrows(), |_, j| mean[(j, 0)]);
    let mut batched =
        sample_posterior_batch(&means, std::slice::from_ref(precision), n_samples, rng)?;
    Ok(batched.remove(0))
}

/// Draws `n_samples` posterior samples for every batch unit.
///
/// `means` holds one unit per row (`units x coefficients`) and `precisions`
/// one matrix per unit. The output is always explicitly stacked: one
/// `coefficients x n_samples` matrix per unit, even for a batch of one.
/// Units are sampled in order from the shared `rng`.
///
/// # Errors
///
/// Returns `SamplerError` if `n_samples` is zero, batch sizes or matrix
/// shapes are inconsistent, or any unit's precision matrix is non-finite or
/// not positive-definite. The error names the offending unit.
pub fn sample_posterior_batch<R: Rng>(
    means: &Mat<f64>,
    precisions: &[Mat<f64>],
    n_samples: usize,
    rng: &mut R,
) -> Result<Vec<Mat<f64>>, SamplerError> {
    if n_samples == 0 {
        return Err(SamplerError::InvalidSampleCount);
    }
    let n_units = means.nrows();
    let n_coefs = means.ncols();
    if n_units == 0 || n_coefs == 0 {
        return Err(SamplerError::EmptyMeans);
    }
    if precisions.len() != n_units {
        return Err(SamplerError::BatchSizeMismatch {
            units: n_units,
            precisions: precisions.len(),
        });
    }

    let mut samples = Vec::with_capacity(n_units);
    for (unit, precision) in precisions.iter().enumerate() {
        if precision.nrows() != n_coefs || precision.ncols() != n_coefs {
            return Err(SamplerError::PrecisionShapeMismatch {
                coefficients: n_coefs,
                rows: precision.nrows(),
                cols: precision.ncols(),
            });
        }
        if !matrix_is_finite(precision) {
            return Err(SamplerError::NonFinitePrecision { unit });
        }
        let lower =
            cholesky_lower(precision).ok_or(SamplerError::NotPositiveDefinite { unit })?;

        let mut standard_normal = Mat::<f64>::zeros(n_coefs, n_samples);
        for sample in 0..n_samples {
            for coef in 0..n_coefs {
                standard_normal[(coef, sample)] = rng.sample::<f64, _>(StandardNormal);
            }
        }

        // Columns of S solve L·S = Z, so each has covariance precision⁻¹.
        let mut unit_samples = forward_substitute(&lower, &standard_normal);
        for sample in 0..n_samples {
            for coef in 0..n_coefs {
                unit_samples[(coef, sample)] += means[(unit, coef)];
            }
        }
        samples.push(unit_samples);
    }
    Ok(samples)
}
