//! Shared measurement pipeline.
//!
//! catalog discovery -> per-tile gridding (parallel) -> dataset -> resampling -> report
//!
//! The CLI only handles presentation and exports on top of `run_measure`.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::domain::{BiasReport, Dataset, RunConfig};
use crate::error::AppError;
use crate::estimate::resample::{ResampleConfig, Uncertainty, resample};
use crate::grid::aggregate::grid_file_pair;
use crate::io::gather::{CatalogPair, gather_catalogs};
use crate::report::{build_report, has_non_finite};
use crate::weights::{ShearWeight, weights_for};

/// All computed outputs of a single `mbias measure` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub uncertainty: Uncertainty,
    pub report: BiasReport,
}

/// Execute the full measurement pipeline.
pub fn run_measure(config: &RunConfig) -> Result<RunOutput, AppError> {
    validate_config(config)?;

    let catalogs = gather_catalogs(&config.imsim_dir)?;
    if catalogs.is_empty() {
        return Err(AppError::new(
            2,
            format!("No paired catalogs found under '{}'.", config.imsim_dir.display()),
        ));
    }
    info!("Processing {} paired simulations", catalogs.len());

    let pool = build_pool(config.n_jobs)?;
    let weights = weights_for(config.weights);

    let dataset = pool.install(|| build_dataset(&catalogs, config, weights.as_ref()))?;
    info!("Dataset: {} rows from {} tiles", dataset.len(), dataset.tile_count);

    let uncertainty = run_resample(&pool, &dataset, config)?;

    let report = build_report(&configuration_name(config), &uncertainty, dataset.tile_count);
    if has_non_finite(&report) {
        warn!("bias estimate is not finite (zero or empty response denominator)");
    }

    Ok(RunOutput {
        dataset,
        uncertainty,
        report,
    })
}

/// Grid every tile pair on the current rayon pool and concatenate the rows.
///
/// The first failing tile aborts the whole batch.
pub fn build_dataset(
    catalogs: &BTreeMap<String, CatalogPair>,
    config: &RunConfig,
    weights: &dyn ShearWeight,
) -> Result<Dataset, AppError> {
    let tables = catalogs
        .par_iter()
        .map(|(tile, pair)| {
            debug!("gridding tile {tile}");
            grid_file_pair(tile, &pair.plus, &pair.minus, config, weights)
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Dataset::from_tables(tables))
}

/// Run the configured resampler over a dataset on `pool`.
pub fn run_resample(pool: &ThreadPool, dataset: &Dataset, config: &RunConfig) -> Result<Uncertainty, AppError> {
    if dataset.is_empty() {
        return Err(AppError::new(3, "Dataset is empty; nothing to estimate."));
    }

    info!("Computing uncertainties via {}", config.resample);
    let resample_config = ResampleConfig {
        kind: config.resample,
        seed: config.seed,
        bootstrap_count: config.bootstrap_count,
    };
    pool.install(|| resample(&dataset.rows, &resample_config))
}

fn validate_config(config: &RunConfig) -> Result<(), AppError> {
    if config.ngrid == 0 {
        return Err(AppError::new(2, "`--grid` must be >= 1."));
    }
    if config.n_jobs == 0 {
        return Err(AppError::new(2, "`--n-jobs` must be >= 1."));
    }
    if config.bootstrap_count == 0 {
        return Err(AppError::new(2, "`--bootstrap-count` must be >= 1."));
    }
    Ok(())
}

fn build_pool(n_jobs: usize) -> Result<ThreadPool, AppError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_jobs)
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start worker pool: {e}")))
}

/// Name of the simulation configuration: the input directory's name.
fn configuration_name(config: &RunConfig) -> String {
    config
        .imsim_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.imsim_dir.display().to_string())
}
