//! # Estimator
//!
//! Regularized least-squares posterior estimation, equivalently the MAP
//! estimate of a Bayesian linear-Gaussian model. One call solves a single
//! observation vector or a whole batch of independent observation vectors
//! sharing the same design matrix, returning the posterior mean, the
//! residual variance, and optionally the posterior precision per unit.
//!
//! Internally every call is carried as an explicit batch (possibly of one
//! unit); the single-unit functions only squeeze shapes at the API
//! boundary. A `+inf` diagonal entry of the regularization matrix
//! hard-constrains the corresponding coefficient: its posterior-mean
//! component is exactly zero and the reported unscaled precision keeps
//! `+inf` on that diagonal.

use faer::Mat;
use thiserror::Error;

use crate::matrix_ops::{gram_matrix, matrix_is_finite, solve_columns};

/// Errors returned by posterior estimation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimatorError {
    #[error("design matrix must have at least one row and one column")]
    EmptyDesign,
    #[error("observation batch must contain at least one unit")]
    EmptyBatch,
    #[error("single-unit observations must be a single column matrix")]
    ObservationNotColumn,
    #[error("observation length ({observations}) must match design rows ({rows})")]
    ObservationShapeMismatch { observations: usize, rows: usize },
    #[error(
        "regularization matrix must be {coefficients} x {coefficients}, got {rows} x {cols}"
    )]
    RegularizationShapeMismatch {
        coefficients: usize,
        rows: usize,
        cols: usize,
    },
    #[error(
        "regularization entry ({row}, {col}) is invalid: diagonal entries must be \
         non-negative (possibly +inf), off-diagonal entries must be finite"
    )]
    InvalidRegularizationEntry { row: usize, col: usize },
    #[error("design matrix contains non-finite values")]
    NonFiniteDesign,
    #[error("observations contain non-finite values")]
    NonFiniteObservations,
    #[error("regularized precision matrix is singular")]
    SingularPrecision,
}

/// Posterior summary for a single observation vector.
#[derive(Debug, Clone)]
pub struct PosteriorFit {
    /// Posterior mean of the coefficients, `coefficients x 1`.
    pub mean: Mat<f64>,
    /// Estimated noise variance of the fit, `>= 0`.
    pub residual_variance: f64,
    /// Posterior precision scaled by the residual variance,
    /// `coefficients x coefficients`. `None` unless requested.
    pub precision: Option<Mat<f64>>,
}

/// Posterior summaries for a batch of observation vectors.
#[derive(Debug, Clone)]
pub struct BatchPosteriorFit {
    /// Posterior means, one row per batch unit (`units x coefficients`).
    pub means: Mat<f64>,
    /// Estimated noise variance per batch unit.
    pub residual_variances: Vec<f64>,
    /// Scaled posterior precision per batch unit. `None` unless requested.
    pub precisions: Option<Vec<Mat<f64>>>,
}

/// Fits the posterior for a single observation vector.
///
/// `design` is `observations x coefficients`, `y` is a column of length
/// `observations`, and `regularization`, when given, is a symmetric
/// positive-semidefinite `coefficients x coefficients` matrix added to the
/// Gram matrix before the solve.
///
/// # Errors
///
/// Returns `EstimatorError` if dimensions are inconsistent, inputs are
/// non-finite, regularization entries are invalid, or the regularized
/// precision matrix is singular.
///
/// # Examples
///
/// ```
/// use faer::Mat;
/// use bayes_linear::fit_posterior;
///
/// // y = 1 + 2x sampled at x = 0, 1, 2
/// let design = Mat::from_fn(3, 2, |i, j| {
///     if j == 0 {
///         1.0
///     } else {
///         f64::from(u32::try_from(i).unwrap_or(u32::MAX))
///     }
/// });
/// let y = Mat::from_fn(3, 1, |i, _| {
///     2.0f64.mul_add(f64::from(u32::try_from(i).unwrap_or(u32::MAX)), 1.0)
/// });
///
/// let fit = fit_posterior(&design, &y, None).unwrap();
/// assert!((fit.mean[(0, 0)] - 1.0).abs() < 1.0e-9);
/// assert!((fit.mean[(1, 0)] - 2.0).abs() < 1.0e-9);
/// assert!(fit.residual_variance < 1.0e-12);
/// ```
pub fn fit_posterior(
    design: &Mat<f64>,
    y: &Mat<f64>,
    regularization: Option<&Mat<f64>>,
) -> Result<PosteriorFit, EstimatorError> {
    fit_single(design, y, regularization, false)
}

/// Like [`fit_posterior`], additionally returning the scaled posterior
/// precision (`precision` is always `Some`).
///
/// # Errors
///
/// Returns `EstimatorError` under the same conditions as [`fit_posterior`].
pub fn fit_posterior_with_precision(
    design: &Mat<f64>,
    y: &Mat<f64>,
    regularization: Option<&Mat<f64>>,
) -> Result<PosteriorFit, EstimatorError> {
    fit_single(design, y, regularization, true)
}

/// Fits posteriors for a batch of observation vectors sharing one design.
///
/// `observations` holds one unit per row (`units x observations`). Outputs
/// are always explicitly stacked, even for a batch of one.
///
/// # Errors
///
/// Returns `EstimatorError` if dimensions are inconsistent, inputs are
/// non-finite, regularization entries are invalid, or the regularized
/// precision matrix is singular.
pub fn fit_posterior_batch(
    design: &Mat<f64>,
    observations: &Mat<f64>,
    regularization: Option<&Mat<f64>>,
) -> Result<BatchPosteriorFit, EstimatorError> {
    fit_batch(design, observations, regularization, false)
}

/// Like [`fit_posterior_batch`], additionally returning the scaled
/// posterior precision of every unit (`precisions` is always `Some`).
///
/// # Errors
///
/// Returns `EstimatorError` under the same conditions as
/// [`fit_posterior_batch`].
pub fn fit_posterior_batch_with_precision(
    design: &Mat<f64>,
    observations: &Mat<f64>,
    regularization: Option<&Mat<f64>>,
) -> Result<BatchPosteriorFit, EstimatorError> {
    fit_batch(design, observations, regularization, true)
}

fn fit_single(
    design: &Mat<f64>,
    y: &Mat<f64>,
    regularization: Option<&Mat<f64>>,
    want_precision: bool,
) -> Result<PosteriorFit, EstimatorError> {
    if y.ncols() != 1 {
        return Err(EstimatorError::ObservationNotColumn);
    }
    let observations = Mat::from_fn(1, y.nrows(), |_, j| y[(j, 0)]);
    let mut batch = fit_batch(design, &observations, regularization, want_precision)?;
    let mean = Mat::from_fn(batch.means.ncols(), 1, |i, _| batch.means[(0, i)]);
    Ok(PosteriorFit {
        mean,
        residual_variance: batch.residual_variances[0],
        precision: batch
            .precisions
            .as_mut()
            .map(|precisions| precisions.remove(0)),
    })
}

fn fit_batch(
    design: &Mat<f64>,
    observations: &Mat<f64>,
    regularization: Option<&Mat<f64>>,
    want_precision: bool,
) -> Result<BatchPosteriorFit, EstimatorError> {
    let n_obs = design.nrows();
    let n_coefs = design.ncols();
    if n_obs == 0 || n_coefs == 0 {
        return Err(EstimatorError::EmptyDesign);
    }
    let n_units = observations.nrows();
    if n_units == 0 {
        return Err(EstimatorError::EmptyBatch);
    }
    if observations.ncols() != n_obs {
        return Err(EstimatorError::ObservationShapeMismatch {
            observations: observations.ncols(),
            rows: n_obs,
        });
    }
    if !matrix_is_finite(design) {
        return Err(EstimatorError::NonFiniteDesign);
    }
    if !matrix_is_finite(observations) {
        return Err(EstimatorError::NonFiniteObservations);
    }

    let gram = gram_matrix(design);
    let mut unscaled_precision = gram.clone();
    let mut constrained = vec![false; n_coefs];
    if let Some(reg) = regularization {
        if reg.nrows() != n_coefs || reg.ncols() != n_coefs {
            return Err(EstimatorError::RegularizationShapeMismatch {
                coefficients: n_coefs,
                rows: reg.nrows(),
                cols: reg.ncols(),
            });
        }
        for row in 0..n_coefs {
            for col in 0..n_coefs {
                let entry = reg[(row, col)];
                if row == col {
                    if entry.is_nan() || entry < 0.0 {
                        return Err(EstimatorError::InvalidRegularizationEntry { row, col });
                    }
                    if entry == f64::INFINITY {
                        constrained[row] = true;
                    } else {
                        unscaled_precision[(row, col)] += entry;
                    }
                } else {
                    if !entry.is_finite() {
                        return Err(EstimatorError::InvalidRegularizationEntry { row, col });
                    }
                    unscaled_precision[(row, col)] += entry;
                }
            }
        }
    }

    let design_t = Mat::from_fn(n_coefs, n_obs, |i, j| design[(j, i)]);
    let pseudo_inverse = solve_pseudo_inverse(&unscaled_precision, &design_t, &constrained)?;

    // An infinitely regularized coefficient keeps +inf on the reported
    // precision diagonal while its pseudo-inverse row is exactly zero.
    for (index, flag) in constrained.iter().enumerate() {
        if *flag {
            unscaled_precision[(index, index)] = f64::INFINITY;
        }
    }

    let dof = effective_residual_dof(&pseudo_inverse, design, &gram, n_obs);

    let pseudo_inverse_t = pseudo_inverse.transpose().to_owned();
    let means = observations * &pseudo_inverse_t;
    let fitted = &means * &design_t;

    let mut residual_variances = Vec::with_capacity(n_units);
    for unit in 0..n_units {
        let mut rss = 0.0;
        for obs in 0..n_obs {
            let residual = observations[(unit, obs)] - fitted[(unit, obs)];
            rss += residual * residual;
        }
        // A fully saturated or fully regularized model has no residual
        // degrees of freedom; report zero variance instead of 0/0.
        let variance = if dof > 0.0 { rss / dof } else { 0.0 };
        residual_variances.push(variance);
    }

    let precisions = if want_precision {
        let scaled = residual_variances
            .iter()
            .map(|&variance| {
                Mat::from_fn(n_coefs, n_coefs, |i, j| unscaled_precision[(i, j)] / variance)
            })
            .collect();
        Some(scaled)
    } else {
        None
    };

    Ok(BatchPosteriorFit {
        means,
        residual_variances,
        precisions,
    })
}

/// Solves `unscaled_precision · X = designᵀ`, excluding infinitely
/// regularized coefficients from the system so their rows of `X` come out
/// exactly zero.
fn solve_pseudo_inverse(
    unscaled_precision: &Mat<f64>,
    design_t: &Mat<f64>,
    constrained: &[bool],
) -> Result<Mat<f64>, EstimatorError> {
    let n_coefs = design_t.nrows();
    let n_obs = design_t.ncols();

    let free: Vec<usize> = (0..n_coefs).filter(|&index| !constrained[index]).collect();
    let solution = if free.is_empty() {
        Mat::<f64>::zeros(n_coefs, n_obs)
    } else if free.len() == n_coefs {
        solve_columns(unscaled_precision, design_t).ok_or(EstimatorError::SingularPrecision)?
    } else {
        let reduced = Mat::from_fn(free.len(), free.len(), |i, j| {
            unscaled_precision[(free[i], free[j])]
        });
        let reduced_rhs = Mat::from_fn(free.len(), n_obs, |i, j| design_t[(free[i], j)]);
        let reduced_solution =
            solve_columns(&reduced, &reduced_rhs).ok_or(EstimatorError::SingularPrecision)?;
        let mut full = Mat::<f64>::zeros(n_coefs, n_obs);
        for (slot, &coef) in free.iter().enumerate() {
            for obs in 0..n_obs {
                full[(coef, obs)] = reduced_solution[(slot, obs)];
            }
        }
        full
    };
    if !matrix_is_finite(&solution) {
        return Err(EstimatorError::SingularPrecision);
    }
    Ok(solution)
}

/// Squared Frobenius norm of `I - H` where `H = design · X` is the smoother
/// (hat) matrix, computed as `n - 2 tr(H) + tr(H Hᵀ)` through
/// `coefficients x coefficients` products so the `observations x
/// observations` smoother is never materialized.
fn effective_residual_dof(
    pseudo_inverse: &Mat<f64>,
    design: &Mat<f64>,
    gram: &Mat<f64>,
    n_obs: usize,
) -> f64 {
    let n_coefs = pseudo_inverse.nrows();
    let xg = pseudo_inverse * design;
    let xxt = pseudo_inverse * pseudo_inverse.transpose();
    let mut trace_h = 0.0;
    for index in 0..n_coefs {
        trace_h += xg[(index, index)];
    }
    let mut trace_h_ht = 0.0;
    for row in 0..n_coefs {
        for col in 0..n_coefs {
            trace_h_ht += xxt[(row, col)] * gram[(col, row)];
        }
    }
    let dof = (2.0 * trace_h).mul_add(-1.0, usize_to_f64(n_obs)) + trace_h_ht;
    dof.max(0.0)
}

fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}
