#![forbid(unsafe_code)]

//! # `bayes_linear`
//!
//! Batched Bayesian linear regression: regularized least-squares posterior
//! estimation and multivariate-normal posterior sampling.
//!
//! The crate was initially developed as the per-voxel estimation engine of a
//! diffusion-model fitting pipeline, but the API is intentionally
//! domain-agnostic: it consumes a plain design matrix and observation
//! vectors and can be reused for any linear-Gaussian model.
//!
//! Two components share one data contract:
//!
//! - The **estimator** ([`fit_posterior`], [`fit_posterior_batch`] and their
//!   `_with_precision` variants) solves the regularized least-squares
//!   problem for one or many independent observation vectors sharing a
//!   design matrix, returning the posterior mean, the residual variance,
//!   and optionally the scaled posterior precision.
//! - The **sampler** ([`sample_posterior`], [`sample_posterior_batch`])
//!   draws multivariate-normal samples around a posterior mean with
//!   covariance equal to the inverse of the supplied precision, through a
//!   Cholesky factorization and a triangular solve.
//!
//! All matrices are dense double-precision [`faer::Mat`] values with the
//! batch axis first, then rows, then columns. Hard zeros are supported: a
//! `+inf` diagonal entry of the regularization matrix constrains the
//! corresponding coefficient's posterior mean to exactly zero.

pub mod estimator;
pub mod matrix_ops;
pub mod sampler;
pub mod summary;

pub use estimator::{
    BatchPosteriorFit, EstimatorError, PosteriorFit, fit_posterior, fit_posterior_batch,
    fit_posterior_batch_with_precision, fit_posterior_with_precision,
};
pub use sampler::{SamplerError, sample_posterior, sample_posterior_batch};
pub use summary::{CoefficientSummary, summarize_samples};
