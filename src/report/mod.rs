//! Reporting utilities: report rows and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::BiasReport;
use crate::estimate::resample::Uncertainty;

/// Build the summary row of one configuration run.
pub fn build_report(configuration_name: &str, uncertainty: &Uncertainty, tile_count: usize) -> BiasReport {
    let mean = uncertainty.mean;
    let band = uncertainty.three_sigma();
    BiasReport {
        configuration_name: configuration_name.to_string(),
        m_mean: mean.m,
        m_3sigma: band.m,
        c1_mean: mean.c1,
        c1_3sigma: band.c1,
        c2_mean: mean.c2,
        c2_3sigma: band.c2,
        tile_count,
    }
}

/// Whether any reported value is NaN or infinite.
pub fn has_non_finite(report: &BiasReport) -> bool {
    [
        report.m_mean,
        report.m_3sigma,
        report.c1_mean,
        report.c1_3sigma,
        report.c2_mean,
        report.c2_3sigma,
    ]
    .iter()
    .any(|v| !v.is_finite())
}
