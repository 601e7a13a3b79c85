//! Per-coefficient summaries of posterior sample matrices.

use faer::Mat;
use num_traits::ToPrimitive;

/// Scalar summary statistics for one coefficient's posterior draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoefficientSummary {
    pub mean: f64,
    /// Population standard deviation across draws (divides by the draw
    /// count, not `n - 1`).
    pub std_dev: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
}

/// Summarizes a `coefficients x n_samples` sample matrix, one entry per
/// coefficient row.
#[must_use]
pub fn summarize_samples(samples: &Mat<f64>) -> Vec<CoefficientSummary> {
    (0..samples.nrows())
        .map(|coef| {
            let values: Vec<f64> = (0..samples.ncols())
                .map(|sample| samples[(coef, sample)])
                .collect();
            summarize_scalar(&values)
        })
        .collect()
}

fn summarize_scalar(values: &[f64]) -> CoefficientSummary {
    if values.is_empty() {
        return CoefficientSummary::default();
    }

    let n = usize_to_f64(values.len());
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>()
        / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    CoefficientSummary {
        mean,
        std_dev: variance.sqrt(),
        q025: percentile(&sorted, 0.025),
        q50: percentile(&sorted, 0.5),
        q975: percentile(&sorted, 0.975),
    }
}

fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0);
    let upper = position.ceil().to_usize().unwrap_or(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}

fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}
