//! Export the run report and the per-cell dataset.
//!
//! Both are meant to be easy to consume from notebooks or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{BiasReport, Dataset, ResampleKind, Step, StepStats};
use crate::error::AppError;

/// Write the report as a one-row CSV.
pub fn write_report_csv(path: &Path, report: &BiasReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    writer
        .serialize(report)
        .map_err(|e| AppError::new(2, format!("Failed to write report CSV row: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush report CSV: {e}")))?;
    Ok(())
}

/// Column names of the dataset export, in write order.
pub fn dataset_columns() -> Vec<String> {
    let mut cols = vec!["tile".to_string(), "grid_ind".to_string()];
    for tail in ["_p", "_m"] {
        for step in Step::ALL {
            for stat in ["g1", "g2", "n"] {
                cols.push(format!("{stat}{}{tail}", step.column_suffix()));
            }
        }
    }
    cols
}

/// Write one row per paired cell; missing statistics are empty fields.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset CSV '{}': {e}", path.display())))?;
    write_dataset(file, dataset)
}

pub fn write_dataset<W: Write>(out: W, dataset: &Dataset) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(dataset_columns())
        .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV header: {e}")))?;

    for row in &dataset.rows {
        let mut fields = Vec::with_capacity(2 + 30);
        fields.push(row.tile.to_string());
        fields.push(row.cell.to_string());
        push_stats(&mut fields, &row.plus);
        push_stats(&mut fields, &row.minus);
        writer
            .write_record(&fields)
            .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush dataset CSV: {e}")))?;
    Ok(())
}

fn push_stats(fields: &mut Vec<String>, stats: &StepStats) {
    for slot in stats {
        match slot {
            Some(m) => {
                fields.push(format!("{:.10e}", m.g1));
                fields.push(format!("{:.10e}", m.g2));
                fields.push(format!("{:.10e}", m.n));
            }
            None => fields.extend(std::iter::repeat_n(String::new(), 3)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportJson<'a> {
    tool: &'static str,
    generated_at: DateTime<Utc>,
    resample: ResampleKind,
    #[serde(flatten)]
    report: &'a BiasReport,
}

/// Pretty JSON rendering of the report, stamped with the current time.
pub fn report_json(report: &BiasReport, resample: ResampleKind) -> Result<String, AppError> {
    let doc = ReportJson {
        tool: "mbias",
        generated_at: Utc::now(),
        resample,
        report,
    };
    serde_json::to_string_pretty(&doc).map_err(|e| AppError::new(2, format!("Failed to serialize report JSON: {e}")))
}
