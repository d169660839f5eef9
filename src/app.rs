//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the measurement pipeline or the simulator
//! - prints the report
//! - writes optional exports

use clap::Parser;
use log::info;

use crate::cli::{Command, MeasureArgs, SimulateArgs};
use crate::data::synth::{SimConfig, write_simulation};
use crate::domain::RunConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `mbias` binary.
pub fn run() -> Result<(), AppError> {
    // `mbias <DIR>` behaves like `mbias measure <DIR>`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Measure(args) => handle_measure(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_measure(args: MeasureArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_measure(&config)?;

    if config.json {
        println!("{}", crate::io::export::report_json(&run.report, config.resample)?);
    } else {
        println!(
            "{}",
            crate::report::format_run_summary(&config, run.dataset.len(), &run.uncertainty)
        );
        print!("{}", crate::report::format_report_table(std::slice::from_ref(&run.report)));
    }

    if let Some(path) = &config.export_report {
        crate::io::export::write_report_csv(path, &run.report)?;
        info!("wrote report to {}", path.display());
    }
    if let Some(path) = &config.export_dataset {
        crate::io::export::write_dataset_csv(path, &run.dataset)?;
        info!("wrote dataset to {}", path.display());
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = sim_config_from_args(&args);
    let tiles = write_simulation(&config)?;
    info!("wrote {} paired tiles to {}", tiles.len(), config.out_dir.display());
    Ok(())
}

pub fn run_config_from_args(args: &MeasureArgs) -> RunConfig {
    RunConfig {
        imsim_dir: args.imsim_dir.clone(),
        ngrid: args.grid,
        n_jobs: args.n_jobs,
        resample: args.resample,
        seed: args.seed,
        bootstrap_count: args.bootstrap_count,
        domain_side: args.domain_size,
        weights: args.weights,
        export_report: args.export.clone(),
        export_dataset: args.export_dataset.clone(),
        json: args.json,
    }
}

pub fn sim_config_from_args(args: &SimulateArgs) -> SimConfig {
    SimConfig {
        out_dir: args.out.clone(),
        tiles: args.tiles,
        objects: args.objects,
        shear: args.shear,
        m_true: args.m_true,
        c_true: args.c_true,
        shape_noise: args.shape_noise,
        measurement_var: args.measurement_var,
        flag_fraction: args.flag_fraction,
        seed: args.seed,
        domain_side: args.domain_size,
    }
}

/// Rewrite argv so a bare directory argument means `measure`.
///
/// Rules:
/// - `mbias`                       -> unchanged (clap prints usage)
/// - `mbias --help/--version/-h`   -> unchanged
/// - `mbias measure|simulate ...`  -> unchanged
/// - `mbias <DIR> ...` / `mbias --grid 4 <DIR>` -> `mbias measure ...`
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "measure" | "simulate");
    if is_subcommand {
        return argv;
    }

    argv.insert(1, "measure".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::{ResampleKind, WeightScheme};

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_directory_means_measure() {
        assert_eq!(rewrite_args(args(&["mbias", "/sims/a"])), args(&["mbias", "measure", "/sims/a"]));
        assert_eq!(
            rewrite_args(args(&["mbias", "--grid", "4", "/sims/a"])),
            args(&["mbias", "measure", "--grid", "4", "/sims/a"])
        );
        assert_eq!(rewrite_args(args(&["mbias", "simulate"])), args(&["mbias", "simulate"]));
        assert_eq!(rewrite_args(args(&["mbias", "--help"])), args(&["mbias", "--help"]));
        assert_eq!(rewrite_args(args(&["mbias"])), args(&["mbias"]));
    }

    #[test]
    fn measure_defaults_match_run_config() {
        let cli = Cli::parse_from(rewrite_args(args(&["mbias", "/sims/cfg"])));
        let Command::Measure(m) = cli.command else {
            panic!("expected measure");
        };
        let config = run_config_from_args(&m);
        let defaults = RunConfig::new("/sims/cfg");
        assert_eq!(config.ngrid, defaults.ngrid);
        assert_eq!(config.n_jobs, defaults.n_jobs);
        assert_eq!(config.seed, defaults.seed);
        assert_eq!(config.resample, ResampleKind::Jackknife);
        assert_eq!(config.bootstrap_count, 1000);
        assert_eq!(config.domain_side, 10_000.0);
        assert_eq!(config.weights, WeightScheme::InverseVariance);
    }

    #[test]
    fn measure_flags_are_parsed() {
        let cli = Cli::parse_from(args(&[
            "mbias",
            "measure",
            "/sims/cfg",
            "--resample",
            "bootstrap",
            "--grid",
            "3",
            "--seed",
            "9",
            "--weights",
            "uniform",
        ]));
        let Command::Measure(m) = cli.command else {
            panic!("expected measure");
        };
        assert_eq!(m.resample, ResampleKind::Bootstrap);
        assert_eq!(m.grid, 3);
        assert_eq!(m.seed, 9);
        assert_eq!(m.weights, WeightScheme::Uniform);
    }

    #[test]
    fn simulate_accepts_negative_bias() {
        let cli = Cli::parse_from(args(&["mbias", "simulate", "--out", "/tmp/x", "--m-true", "-0.01"]));
        let Command::Simulate(s) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(sim_config_from_args(&s).m_true, -0.01);
    }
}
