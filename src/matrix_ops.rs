//! # Matrix operations
//!
//! Dense linear-algebra helpers shared by the estimator and the sampler:
//! Gram matrix formation, multi-column linear solves, Cholesky
//! factorization, and triangular substitution.

use faer::Mat;
use faer::prelude::Solve;

/// `designᵀ · design`, the unregularized Gram matrix of a design matrix.
#[must_use]
pub fn gram_matrix(design: &Mat<f64>) -> Mat<f64> {
    let design_t = design.transpose().to_owned();
    &design_t * design
}

/// Solves `a · x = rhs` for every right-hand-side column at once through a
/// full-pivoting LU decomposition.
///
/// Returns `None` when `a` is singular, detected as non-finite values in
/// the solution.
#[must_use]
pub fn solve_columns(a: &Mat<f64>, rhs: &Mat<f64>) -> Option<Mat<f64>> {
    let n = a.nrows();
    if a.ncols() != n || rhs.nrows() != n {
        return None;
    }
    let lu = a.full_piv_lu();
    let solution = lu.solve(rhs.clone());
    if !matrix_is_finite(&solution) {
        return None;
    }
    Some(solution)
}

/// Lower-triangular Cholesky factor `L` with `L · Lᵀ = matrix`.
///
/// Returns `None` when `matrix` is not square or not positive-definite.
#[must_use]
pub fn cholesky_lower(matrix: &Mat<f64>) -> Option<Mat<f64>> {
    let dim = matrix.ncols();
    if matrix.nrows() != dim {
        return None;
    }
    let mut lower = Mat::<f64>::zeros(dim, dim);
    for row in 0..dim {
        for col in 0..=row {
            let mut sum = matrix[(row, col)];
            for k in 0..col {
                sum -= lower[(row, k)] * lower[(col, k)];
            }
            if row == col {
                if sum <= 0.0 {
                    return None;
                }
                lower[(row, col)] = sum.sqrt();
            } else {
                let denom = lower[(col, col)];
                if denom <= 0.0 {
                    return None;
                }
                lower[(row, col)] = sum / denom;
            }
        }
    }
    Some(lower)
}

/// Solves `lower · x = rhs` column by column through forward substitution.
///
/// `lower` must be lower-triangular with a nonzero diagonal, as produced by
/// [`cholesky_lower`].
#[must_use]
pub fn forward_substitute(lower: &Mat<f64>, rhs: &Mat<f64>) -> Mat<f64> {
    let n = lower.nrows();
    let mut out = Mat::<f64>::zeros(n, rhs.ncols());
    for col in 0..rhs.ncols() {
        for row in 0..n {
            let mut sum = rhs[(row, col)];
            for inner in 0..row {
                sum -= lower[(row, inner)] * out[(inner, col)];
            }
            out[(row, col)] = sum / lower[(row, row)];
        }
    }
    out
}

#[must_use]
pub fn matrix_is_finite(matrix: &Mat<f64>) -> bool {
    for row in 0..matrix.nrows() {
        for col in 0..matrix.ncols() {
            if !matrix[(row, col)].is_finite() {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gram_matrix_matches_manual_product() {
        let design = Mat::from_fn(3, 2, |i, j| {
            if j == 0 {
                1.0
            } else {
                f64::from(u32::try_from(i).unwrap_or(u32::MAX))
            }
        });
        let gram = gram_matrix(&design);
        assert_relative_eq!(gram[(0, 0)], 3.0);
        assert_relative_eq!(gram[(0, 1)], 3.0);
        assert_relative_eq!(gram[(1, 0)], 3.0);
        assert_relative_eq!(gram[(1, 1)], 5.0);
    }

    #[test]
    fn solve_columns_recovers_known_solution() {
        let a = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 0) => 3.0,
            (1, 1) => 5.0,
            _ => 3.0,
        });
        let rhs = Mat::from_fn(2, 1, |i, _| if i == 0 { 6.0 } else { 8.0 });
        let x = solve_columns(&a, &rhs).expect("matrix is invertible");
        // 3x + 3y = 6, 3x + 5y = 8 => x = 1, y = 1
        assert_relative_eq!(x[(0, 0)], 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(x[(1, 0)], 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn solve_columns_handles_multiple_right_hand_sides() {
        let a = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 0) => 3.0,
            (1, 1) => 5.0,
            _ => 3.0,
        });
        // Columns: (6, 8) -> (1, 1) and (3, 3) -> (1, 0).
        let rhs = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 0) => 6.0,
            (1, 0) => 8.0,
            _ => 3.0,
        });
        let x = solve_columns(&a, &rhs).expect("matrix is invertible");
        assert_relative_eq!(x[(0, 0)], 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(x[(1, 0)], 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(x[(0, 1)], 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(x[(1, 1)], 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn solve_columns_rejects_singular_matrix() {
        let a = Mat::from_fn(2, 2, |_, j| if j == 0 { 1.0 } else { 2.0 });
        let rhs = Mat::from_fn(2, 1, |_, _| 1.0);
        assert!(solve_columns(&a, &rhs).is_none());
    }

    #[test]
    fn cholesky_round_trips_a_positive_definite_matrix() {
        let matrix = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 0) => 10.0,
            (1, 1) => 20.0,
            _ => 1.0,
        });
        let lower = cholesky_lower(&matrix).expect("matrix is positive definite");
        let product = &lower * lower.transpose();
        for row in 0..2 {
            for col in 0..2 {
                assert_relative_eq!(product[(row, col)], matrix[(row, col)], epsilon = 1.0e-12);
            }
        }
    }

    #[test]
    fn cholesky_rejects_indefinite_matrix() {
        let matrix = Mat::from_fn(2, 2, |i, j| if i == j { 1.0 } else { 2.0 });
        assert!(cholesky_lower(&matrix).is_none());
    }

    #[test]
    fn forward_substitute_inverts_lower_triangular_product() {
        let lower = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 0) => 2.0,
            (1, 0) => 1.0,
            (1, 1) => 3.0,
            _ => 0.0,
        });
        let rhs = Mat::from_fn(2, 1, |i, _| if i == 0 { 4.0 } else { 11.0 });
        let x = forward_substitute(&lower, &rhs);
        assert_relative_eq!(x[(0, 0)], 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(x[(1, 0)], 3.0, epsilon = 1.0e-12);
    }

    #[test]
    fn matrix_is_finite_detects_nan() {
        let matrix = Mat::from_fn(2, 1, |i, _| if i == 0 { 1.0 } else { f64::NAN });
        assert!(!matrix_is_finite(&matrix));
    }
}
