//! End-to-end: simulate catalogs, then measure them through the library API.

use std::fs;

use shear_bias::app::pipeline::run_measure;
use shear_bias::data::synth::{SimConfig, write_simulation};
use shear_bias::domain::{ResampleKind, RunConfig, WeightScheme};
use shear_bias::io::export::{write_dataset_csv, write_report_csv};

fn sim(out: &std::path::Path, m_true: f64, c_true: f64) -> SimConfig {
    SimConfig {
        out_dir: out.to_path_buf(),
        tiles: 5,
        objects: 300,
        shear: 0.02,
        m_true,
        c_true,
        shape_noise: 0.22,
        measurement_var: 0.01,
        flag_fraction: 0.02,
        seed: 2024,
        domain_side: 10_000.0,
    }
}

#[test]
fn simulate_then_measure_with_jackknife() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("m-0.01");
    write_simulation(&sim(&root, -0.01, 0.0)).unwrap();

    let mut config = RunConfig::new(&root);
    config.ngrid = 3;
    let out = run_measure(&config).unwrap();

    assert_eq!(out.report.tile_count, 5);
    assert_eq!(out.dataset.len(), 5 * 9);
    assert!((out.report.m_mean + 0.01).abs() < 1e-9);
    assert!(out.report.c1_mean.is_finite());
    assert!(out.report.c2_3sigma.is_finite());
}

#[test]
fn simulate_then_measure_with_bootstrap_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sims");
    write_simulation(&sim(&root, 0.0, 0.0)).unwrap();

    let mut config = RunConfig::new(&root);
    config.resample = ResampleKind::Bootstrap;
    config.bootstrap_count = 25;
    config.weights = WeightScheme::Uniform;
    config.n_jobs = 3;
    let out = run_measure(&config).unwrap();
    assert!(out.report.m_mean.abs() < 1e-9);

    let report_path = dir.path().join("report.csv");
    let dataset_path = dir.path().join("dataset.csv");
    write_report_csv(&report_path, &out.report).unwrap();
    write_dataset_csv(&dataset_path, &out.dataset).unwrap();

    let report = fs::read_to_string(&report_path).unwrap();
    let mut lines = report.lines();
    assert_eq!(
        lines.next().unwrap(),
        "configuration_name,m_mean,m_3sigma,c1_mean,c1_3sigma,c2_mean,c2_3sigma,tile_count"
    );
    assert!(lines.next().unwrap().starts_with("sims,"));

    let dataset = fs::read_to_string(&dataset_path).unwrap();
    // Header + one row per tile with ngrid = 1.
    assert_eq!(dataset.lines().count(), 1 + 5);
}

#[test]
fn mismatched_catalog_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sims");
    write_simulation(&sim(&root, 0.0, 0.0)).unwrap();
    fs::write(
        root.join("tile-0002/plus/catalog.csv"),
        "x,y,mdet_step,mdet_flags,gauss_g_1,gauss_g_2\n1,1,5p,0,0.1,0.1\n",
    )
    .unwrap();

    let err = run_measure(&RunConfig::new(&root)).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("tile-0002"));
}
