//! Jackknife and bootstrap uncertainties for the bias triple.
//!
//! Each resample re-runs the estimator over a view of the dataset; rows are
//! never copied. Resamples are evaluated in parallel (rayon) and collected in
//! resample order, so results do not depend on the number of threads.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{BiasEstimate, PairedRow, ResampleKind};
use crate::error::AppError;
use crate::estimate::bias::estimate_bias;

/// Central value and standard deviation per component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uncertainty {
    pub mean: BiasEstimate,
    pub std: BiasEstimate,
}

impl Uncertainty {
    /// Half-width of the reported band (3σ).
    pub fn three_sigma(&self) -> BiasEstimate {
        BiasEstimate::from_components(self.std.components().map(|s| 3.0 * s))
    }
}

/// Resampling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleConfig {
    pub kind: ResampleKind,
    pub seed: u64,
    pub bootstrap_count: usize,
}

/// Run the configured resampler.
pub fn resample(rows: &[PairedRow], config: &ResampleConfig) -> Result<Uncertainty, AppError> {
    match config.kind {
        ResampleKind::Jackknife => jackknife(rows),
        ResampleKind::Bootstrap => bootstrap(rows, config.seed, config.bootstrap_count),
    }
}

/// Leave-one-out estimates, one per row, in row order.
pub fn jackknife_estimates(rows: &[PairedRow]) -> Vec<BiasEstimate> {
    (0..rows.len())
        .into_par_iter()
        .map(|skip| {
            let view = rows
                .iter()
                .enumerate()
                .filter(move |(i, _)| *i != skip)
                .map(|(_, r)| r);
            estimate_bias(view)
        })
        .collect()
}

/// Jackknife mean and `sqrt((N-1)/N · Σ(est - mean)²)`.
pub fn jackknife(rows: &[PairedRow]) -> Result<Uncertainty, AppError> {
    if rows.is_empty() {
        return Err(AppError::new(3, "Cannot jackknife an empty dataset."));
    }

    let estimates = jackknife_estimates(rows);
    let n = estimates.len() as f64;
    let mean = component_mean(&estimates);
    let factor = (n - 1.0) / n;

    let mu = mean.components();
    let sigma: [f64; 3] = std::array::from_fn(|k| {
        if factor == 0.0 {
            // N = 1: no spread, even if the single estimate is non-finite.
            return 0.0;
        }
        let ss: f64 = estimates.iter().map(|e| (e.components()[k] - mu[k]).powi(2)).sum();
        (factor * ss).sqrt()
    });

    Ok(Uncertainty {
        mean,
        std: BiasEstimate::from_components(sigma),
    })
}

/// Seeds of the individual bootstrap resamples, drawn from the master seed.
fn resample_seeds(seed: u64, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.next_u64()).collect()
}

/// With-replacement estimates, one per resample, in resample order.
pub fn bootstrap_estimates(rows: &[PairedRow], seed: u64, count: usize) -> Vec<BiasEstimate> {
    let n = rows.len();
    resample_seeds(seed, count)
        .into_par_iter()
        .map(|s| {
            let mut rng = StdRng::seed_from_u64(s);
            let view = (0..n).map(move |_| &rows[rng.gen_range(0..n)]);
            estimate_bias(view)
        })
        .collect()
}

/// Bootstrap std (ddof 0) around the full-dataset point estimate.
pub fn bootstrap(rows: &[PairedRow], seed: u64, count: usize) -> Result<Uncertainty, AppError> {
    if rows.is_empty() {
        return Err(AppError::new(3, "Cannot bootstrap an empty dataset."));
    }
    if count == 0 {
        return Err(AppError::new(2, "Bootstrap count must be >= 1."));
    }

    let estimates = bootstrap_estimates(rows, seed, count);
    let mu = component_mean(&estimates).components();
    let n = estimates.len() as f64;
    let sigma: [f64; 3] = std::array::from_fn(|k| {
        let ss: f64 = estimates.iter().map(|e| (e.components()[k] - mu[k]).powi(2)).sum();
        (ss / n).sqrt()
    });

    Ok(Uncertainty {
        mean: estimate_bias(rows),
        std: BiasEstimate::from_components(sigma),
    })
}

fn component_mean(estimates: &[BiasEstimate]) -> BiasEstimate {
    let n = estimates.len() as f64;
    let mut sum = [0.0; 3];
    for e in estimates {
        for (s, v) in sum.iter_mut().zip(e.components()) {
            *s += v;
        }
    }
    BiasEstimate::from_components(sum.map(|s| s / n))
}
