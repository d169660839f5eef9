//! Command-line parsing for the shear bias measurement.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! gridding/estimation code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_BOOTSTRAP_COUNT, DEFAULT_DOMAIN_SIDE, ResampleKind, WeightScheme};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mbias", version, about = "Shear calibration bias from paired image simulations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Measure m, c1, c2 and their uncertainties from paired catalogs.
    Measure(MeasureArgs),
    /// Write synthetic paired catalogs with a known bias.
    Simulate(SimulateArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct MeasureArgs {
    /// Image simulation output directory (`<tile>/plus/*.csv`, `<tile>/minus/*.csv`).
    pub imsim_dir: PathBuf,

    /// RNG seed for bootstrap resampling.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Number of worker threads.
    #[arg(long, default_value_t = 8)]
    pub n_jobs: usize,

    /// Resampling method for uncertainties.
    #[arg(long, value_enum, default_value_t = ResampleKind::Jackknife)]
    pub resample: ResampleKind,

    /// Number of grid cells per side within each tile.
    #[arg(long, default_value_t = 1)]
    pub grid: u32,

    /// Number of bootstrap resamples.
    #[arg(long, default_value_t = DEFAULT_BOOTSTRAP_COUNT)]
    pub bootstrap_count: usize,

    /// Side length of the tile image domain (pixels).
    #[arg(long, default_value_t = DEFAULT_DOMAIN_SIDE)]
    pub domain_size: f64,

    /// Per-object shear weights.
    #[arg(long, value_enum, default_value_t = WeightScheme::InverseVariance)]
    pub weights: WeightScheme,

    /// Export the report row to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the per-cell paired dataset to CSV.
    #[arg(long = "export-dataset")]
    pub export_dataset: Option<PathBuf>,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output directory.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Number of tiles.
    #[arg(long, default_value_t = 10)]
    pub tiles: usize,

    /// Objects per tile.
    #[arg(long, default_value_t = 5000)]
    pub objects: usize,

    /// Injected axis-1 shear magnitude (plus: +shear, minus: -shear).
    #[arg(long, default_value_t = 0.02)]
    pub shear: f64,

    /// True multiplicative bias.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub m_true: f64,

    /// True additive bias (both components).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub c_true: f64,

    /// Intrinsic shape noise per component.
    #[arg(long, default_value_t = 0.22)]
    pub shape_noise: f64,

    /// Measurement variance written to the covariance columns.
    #[arg(long, default_value_t = 0.01)]
    pub measurement_var: f64,

    /// Fraction of objects flagged unusable.
    #[arg(long, default_value_t = 0.02)]
    pub flag_fraction: f64,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Side length of the tile image domain (pixels).
    #[arg(long, default_value_t = DEFAULT_DOMAIN_SIDE)]
    pub domain_size: f64,
}
