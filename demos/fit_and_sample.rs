use bayes_linear::{fit_posterior_with_precision, sample_posterior, summarize_samples};
use faer::Mat;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

fn main() {
    let n = 500;
    let design = Mat::from_fn(n, 2, |i, j| {
        let x = idx_to_f64(i) / 50.0;
        if j == 0 { 1.0 } else { x }
    });

    // y = 0.5 + 1.5x plus Gaussian noise with variance 0.04.
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.2).expect("valid std dev");
    let mut y = Mat::<f64>::zeros(n, 1);
    for i in 0..n {
        y[(i, 0)] = 1.5f64.mul_add(design[(i, 1)], 0.5) + noise.sample(&mut rng);
    }

    let fit = fit_posterior_with_precision(&design, &y, None).expect("fit");
    println!(
        "posterior mean: [{:.4}, {:.4}], residual variance: {:.5}",
        fit.mean[(0, 0)],
        fit.mean[(1, 0)],
        fit.residual_variance
    );

    let precision = fit.precision.expect("precision was requested");
    let samples = sample_posterior(&fit.mean, &precision, 20_000, &mut rng).expect("sample");

    for (coef, summary) in summarize_samples(&samples).iter().enumerate() {
        println!(
            "coef {coef}: mean {:.4}, sd {:.4}, 95% interval [{:.4}, {:.4}]",
            summary.mean, summary.std_dev, summary.q025, summary.q975
        );
    }
}

fn idx_to_f64(idx: usize) -> f64 {
    f64::from(u32::try_from(idx).unwrap_or(u32::MAX))
}
