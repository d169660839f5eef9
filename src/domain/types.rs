//! Shared domain types.
//!
//! These types flow through the whole pipeline:
//!
//! - catalog objects (`ObjectRecord`) are loaded per realization
//! - per-cell statistics (`StepMoments`, `CellStats`, `TileTable`) are built per tile
//! - paired rows (`PairedRow`) are concatenated into the run `Dataset`
//! - bias triples (`BiasEstimate`) come out of the estimator and the resamplers

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Number of perturbation steps per realization.
pub const N_STEPS: usize = 5;

/// Side length of the simulated image domain, in pixels.
pub const DEFAULT_DOMAIN_SIDE: f64 = 10_000.0;

/// Default number of bootstrap resamples.
pub const DEFAULT_BOOTSTRAP_COUNT: usize = 1000;

/// Synthetic calibration shear applied before measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    #[serde(rename = "noshear")]
    NoShear,
    #[serde(rename = "1p")]
    OneP,
    #[serde(rename = "1m")]
    OneM,
    #[serde(rename = "2p")]
    TwoP,
    #[serde(rename = "2m")]
    TwoM,
}

impl Step {
    /// All steps in table column order.
    pub const ALL: [Step; N_STEPS] = [Step::NoShear, Step::OneP, Step::OneM, Step::TwoP, Step::TwoM];

    /// Position of this step inside per-cell arrays.
    pub fn index(self) -> usize {
        match self {
            Step::NoShear => 0,
            Step::OneP => 1,
            Step::OneM => 2,
            Step::TwoP => 3,
            Step::TwoM => 4,
        }
    }

    /// Catalog label (`mdet_step` column value).
    pub fn label(self) -> &'static str {
        match self {
            Step::NoShear => "noshear",
            Step::OneP => "1p",
            Step::OneM => "1m",
            Step::TwoP => "2p",
            Step::TwoM => "2m",
        }
    }

    /// Column-name suffix used in dataset exports (`g1`, `g1_1p`, ...).
    pub fn column_suffix(self) -> &'static str {
        match self {
            Step::NoShear => "",
            Step::OneP => "_1p",
            Step::OneM => "_1m",
            Step::TwoP => "_2p",
            Step::TwoM => "_2m",
        }
    }

    pub fn parse(label: &str) -> Option<Step> {
        Step::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Step shear `(δ1, δ2)` applied for this step.
    pub fn shear(self, step_size: f64) -> (f64, f64) {
        let half = step_size / 2.0;
        match self {
            Step::NoShear => (0.0, 0.0),
            Step::OneP => (half, 0.0),
            Step::OneM => (-half, 0.0),
            Step::TwoP => (0.0, half),
            Step::TwoM => (0.0, -half),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which paired realization a catalog belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realization {
    Plus,
    Minus,
}

impl Realization {
    /// Sign of the calibration shear injected along axis 1.
    pub fn sign(self) -> f64 {
        match self {
            Realization::Plus => 1.0,
            Realization::Minus => -1.0,
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Realization::Plus => "plus",
            Realization::Minus => "minus",
        }
    }
}

/// One measured object from a catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub x: f64,
    pub y: f64,
    pub step: Step,
    /// Quality flags; zero means usable.
    pub flags: i64,
    pub g1: f64,
    pub g2: f64,
    /// Inputs for the shear weight (not used by the core statistics).
    pub weight_inputs: WeightInputs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightInputs {
    pub g_cov_1_1: Option<f64>,
    pub g_cov_2_2: Option<f64>,
}

/// Weighted statistics for one (cell, step) combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMoments {
    /// Weighted mean of g1.
    pub g1: f64,
    /// Weighted mean of g2.
    pub g2: f64,
    /// Sum of weights.
    pub n: f64,
}

/// Per-step statistics for one realization; `None` when the step had no objects.
pub type StepStats = [Option<StepMoments>; N_STEPS];

/// One row of a `TileTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellStats {
    pub index: u32,
    pub steps: StepStats,
}

impl CellStats {
    pub fn empty(index: u32) -> Self {
        Self {
            index,
            steps: [None; N_STEPS],
        }
    }
}

/// Per-cell statistics for one realization of one tile.
///
/// Always holds `ngrid²` rows; the row position is the cell index.
#[derive(Debug, Clone, PartialEq)]
pub struct TileTable {
    pub ngrid: u32,
    pub cells: Vec<CellStats>,
}

impl TileTable {
    pub fn cell_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.cells.iter().map(|c| c.index)
    }
}

/// A plus and minus realization merged for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedRow {
    /// Tile of origin (provenance only).
    pub tile: Arc<str>,
    pub cell: u32,
    /// `_p` statistics.
    pub plus: StepStats,
    /// `_m` statistics.
    pub minus: StepStats,
}

impl PairedRow {
    /// A row whose statistics are all missing.
    pub fn missing(tile: Arc<str>, cell: u32) -> Self {
        Self {
            tile,
            cell,
            plus: [None; N_STEPS],
            minus: [None; N_STEPS],
        }
    }

    pub fn stats(&self, realization: Realization) -> &StepStats {
        match realization {
            Realization::Plus => &self.plus,
            Realization::Minus => &self.minus,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairedTileTable {
    pub tile: Arc<str>,
    pub ngrid: u32,
    pub rows: Vec<PairedRow>,
}

/// All paired rows of a run.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<PairedRow>,
    pub tile_count: usize,
}

impl Dataset {
    pub fn from_tables(tables: Vec<PairedTileTable>) -> Self {
        let tile_count = tables.len();
        let rows = tables.into_iter().flat_map(|t| t.rows).collect();
        Self { rows, tile_count }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Multiplicative and additive shear biases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasEstimate {
    pub m: f64,
    pub c1: f64,
    pub c2: f64,
}

impl BiasEstimate {
    pub fn components(&self) -> [f64; 3] {
        [self.m, self.c1, self.c2]
    }

    pub fn from_components(v: [f64; 3]) -> Self {
        Self {
            m: v[0],
            c1: v[1],
            c2: v[2],
        }
    }
}

/// Resampling strategy for uncertainties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResampleKind {
    /// Leave-one-row-out.
    Jackknife,
    /// With-replacement resampling driven by `--seed`.
    Bootstrap,
}

impl fmt::Display for ResampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResampleKind::Jackknife => f.write_str("jackknife"),
            ResampleKind::Bootstrap => f.write_str("bootstrap"),
        }
    }
}

/// Per-object shear weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WeightScheme {
    /// Every object counts once.
    Uniform,
    /// `1 / (σ_e² + mean shear variance)`.
    InverseVariance,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults) and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub imsim_dir: PathBuf,
    /// Bins per side of the spatial grid.
    pub ngrid: u32,
    /// Worker threads for tile aggregation and resampling.
    pub n_jobs: usize,
    pub resample: ResampleKind,
    pub seed: u64,
    pub bootstrap_count: usize,
    pub domain_side: f64,
    pub weights: WeightScheme,

    pub export_report: Option<PathBuf>,
    pub export_dataset: Option<PathBuf>,
    pub json: bool,
}

impl RunConfig {
    /// Defaults matching the CLI, rooted at `imsim_dir`.
    pub fn new(imsim_dir: impl Into<PathBuf>) -> Self {
        Self {
            imsim_dir: imsim_dir.into(),
            ngrid: 1,
            n_jobs: 8,
            resample: ResampleKind::Jackknife,
            seed: 1,
            bootstrap_count: DEFAULT_BOOTSTRAP_COUNT,
            domain_side: DEFAULT_DOMAIN_SIDE,
            weights: WeightScheme::InverseVariance,
            export_report: None,
            export_dataset: None,
            json: false,
        }
    }
}

/// Summary of one configuration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub configuration_name: String,
    pub m_mean: f64,
    pub m_3sigma: f64,
    pub c1_mean: f64,
    pub c1_3sigma: f64,
    pub c2_mean: f64,
    pub c2_3sigma: f64,
    pub tile_count: usize,
}
