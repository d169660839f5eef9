//! Synthetic paired catalogs with a known shear bias.
//!
//! Every tile holds one population of objects shared by the plus and minus
//! realizations (same positions and intrinsic shapes), so shape noise cancels
//! in the plus/minus difference. For a step with step shear `δ` and a
//! realization shear `g_true = ±shear` along axis 1 the measured shape is
//!
//! ```text
//! g_meas = e + (1 + m_true)·g_true + δ + c_true
//! ```
//!
//! The step response is exactly 1, so the bias estimator recovers `m_true`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Realization, Step};
use crate::error::AppError;
use crate::estimate::bias::STEP_SIZE;

/// Settings for `mbias simulate`.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub out_dir: PathBuf,
    pub tiles: usize,
    /// Objects per tile (each is measured under all five steps).
    pub objects: usize,
    /// Magnitude of the axis-1 shear injected with opposite signs.
    pub shear: f64,
    pub m_true: f64,
    pub c_true: f64,
    /// Per-component intrinsic shape dispersion.
    pub shape_noise: f64,
    /// Measurement variance written to the covariance columns.
    pub measurement_var: f64,
    /// Fraction of objects flagged as unusable.
    pub flag_fraction: f64,
    pub seed: u64,
    pub domain_side: f64,
}

#[derive(Debug, Clone, Copy)]
struct Object {
    x: f64,
    y: f64,
    e1: f64,
    e2: f64,
    flagged: bool,
}

/// Write `tiles` paired catalogs under `out_dir`; returns the tile directories.
pub fn write_simulation(config: &SimConfig) -> Result<Vec<PathBuf>, AppError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.shape_noise)
        .map_err(|e| AppError::new(2, format!("Shape noise distribution error: {e}")))?;

    let mut tile_dirs = Vec::with_capacity(config.tiles);
    for t in 0..config.tiles {
        let objects: Vec<Object> = (0..config.objects)
            .map(|_| Object {
                x: rng.gen_range(0.0..config.domain_side),
                y: rng.gen_range(0.0..config.domain_side),
                e1: normal.sample(&mut rng),
                e2: normal.sample(&mut rng),
                flagged: rng.gen_bool(config.flag_fraction),
            })
            .collect();

        let dir = config.out_dir.join(format!("tile-{t:04}"));
        for realization in [Realization::Plus, Realization::Minus] {
            let sub = dir.join(realization.dir_name());
            fs::create_dir_all(&sub)
                .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", sub.display())))?;
            write_catalog(&sub.join("catalog.csv"), &objects, realization, config)?;
        }
        tile_dirs.push(dir);
    }

    Ok(tile_dirs)
}

fn validate(config: &SimConfig) -> Result<(), AppError> {
    if config.tiles == 0 || config.objects == 0 {
        return Err(AppError::new(2, "Simulation needs at least one tile and one object."));
    }
    if !(config.domain_side.is_finite() && config.domain_side > 0.0) {
        return Err(AppError::new(2, "Invalid domain size for simulation."));
    }
    if !(config.shape_noise.is_finite() && config.shape_noise >= 0.0) {
        return Err(AppError::new(2, "Shape noise must be finite and >= 0."));
    }
    if !(0.0..=1.0).contains(&config.flag_fraction) {
        return Err(AppError::new(2, "Flag fraction must be within [0, 1]."));
    }
    if !(config.shear.is_finite() && config.m_true.is_finite() && config.c_true.is_finite()) {
        return Err(AppError::new(2, "Invalid shear settings."));
    }
    Ok(())
}

fn write_catalog(path: &Path, objects: &[Object], realization: Realization, config: &SimConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create catalog '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write catalog '{}': {e}", path.display()));

    writer
        .write_record([
            "x",
            "y",
            "mdet_step",
            "mdet_flags",
            "gauss_g_1",
            "gauss_g_2",
            "gauss_g_cov_1_1",
            "gauss_g_cov_2_2",
        ])
        .map_err(write_err)?;

    let g_true = realization.sign() * config.shear * (1.0 + config.m_true);
    let var = format!("{:e}", config.measurement_var);
    for step in Step::ALL {
        let (d1, d2) = step.shear(STEP_SIZE);
        for o in objects {
            let g1 = o.e1 + g_true + d1 + config.c_true;
            let g2 = o.e2 + d2 + config.c_true;
            writer
                .write_record([
                    o.x.to_string(),
                    o.y.to_string(),
                    step.label().to_string(),
                    u8::from(o.flagged).to_string(),
                    format!("{g1:e}"),
                    format!("{g2:e}"),
                    var.clone(),
                    var.clone(),
                ])
                .map_err(write_err)?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush catalog '{}': {e}", path.display())))?;
    Ok(())
}
