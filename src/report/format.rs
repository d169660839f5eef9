//! Formatted terminal output.
//!
//! Formatting lives here so the estimator code stays clean and output changes
//! stay localized.

use crate::domain::{BiasReport, RunConfig};
use crate::estimate::resample::Uncertainty;

const TABLE_HEADER: &str =
    "| configuration | m mean | m std (3σ) | c_1 mean | c_1 std (3σ) | c_2 mean | c_2 std (3σ) | # tiles |";

/// Markdown table of report rows (header + one line per row).
pub fn format_report_table(reports: &[BiasReport]) -> String {
    let mut out = String::new();
    out.push_str(TABLE_HEADER);
    out.push('\n');
    out.push_str("|---|---|---|---|---|---|---|---|\n");
    for r in reports {
        out.push_str(&format_report_row(r));
        out.push('\n');
    }
    out
}

pub fn format_report_row(r: &BiasReport) -> String {
    format!(
        "| {} | {} | {} | {} | {} | {} | {} | {} |",
        r.configuration_name,
        fmt_sci(r.m_mean),
        fmt_sci(r.m_3sigma),
        fmt_sci(r.c1_mean),
        fmt_sci(r.c1_3sigma),
        fmt_sci(r.c2_mean),
        fmt_sci(r.c2_3sigma),
        r.tile_count,
    )
}

/// Human-readable intervals (`mean ± 3σ`) for each component.
pub fn format_run_summary(config: &RunConfig, rows: usize, uncertainty: &Uncertainty) -> String {
    let mut out = String::new();
    out.push_str("=== mbias - shear calibration bias ===\n");
    out.push_str(&format!("Input: {}\n", config.imsim_dir.display()));
    out.push_str(&format!(
        "Grid: {g}x{g} | rows={rows} | resample={}\n",
        config.resample,
        g = config.ngrid,
    ));

    let band = uncertainty.three_sigma();
    let mean = uncertainty.mean;
    for (name, mu, half) in [("m", mean.m, band.m), ("c1", mean.c1, band.c1), ("c2", mean.c2, band.c2)] {
        out.push_str(&format!(
            "{name:<3} ({}, {})  mean={}  3σ={}\n",
            fmt_sci(mu - half),
            fmt_sci(mu + half),
            fmt_sci(mu),
            fmt_sci(half),
        ));
    }
    out
}

/// Three significant decimals in scientific notation, e.g. `1.234e-3`.
fn fmt_sci(v: f64) -> String {
    format!("{v:.3e}")
}
