//! Catalog CSV ingest.
//!
//! A catalog is one realization (plus or minus) of one tile. Required columns:
//! `x`, `y`, `mdet_step`, `mdet_flags`, `gauss_g_1`, `gauss_g_2`. The weight
//! inputs `gauss_g_cov_1_1` / `gauss_g_cov_2_2` are optional.
//!
//! Unlike a screening tool we cannot skip bad rows: a malformed catalog would
//! silently bias the estimate, so any row error fails the whole file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{ObjectRecord, Step, WeightInputs};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 6] = ["x", "y", "mdet_step", "mdet_flags", "gauss_g_1", "gauss_g_2"];

/// Load every object of a catalog file.
pub fn load_catalog(path: &Path) -> Result<Vec<ObjectRecord>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open catalog '{}': {e}", path.display())))?;
    read_catalog(file).map_err(|e| e.context(format!("Catalog '{}'", path.display())))
}

/// Parse catalog CSV from any reader.
pub fn read_catalog<R: Read>(reader: R) -> Result<Vec<ObjectRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Data starts on line 2 (line 1 is the header).
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("line {line}: CSV parse error: {e}")))?;
        let object =
            parse_row(&record, &header_map).map_err(|e| AppError::new(2, format!("line {line}: {e}")))?;
        records.push(object);
    }

    Ok(records)
}

/// Quality cut: keep objects with `mdet_flags == 0`.
pub fn usable_records(records: Vec<ObjectRecord>) -> Vec<ObjectRecord> {
    records.into_iter().filter(|r| r.flags == 0).collect()
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<ObjectRecord, String> {
    let x = parse_f64(get_required(record, header_map, "x")?, "x")?;
    let y = parse_f64(get_required(record, header_map, "y")?, "y")?;

    let step_label = get_required(record, header_map, "mdet_step")?;
    let step = Step::parse(step_label).ok_or_else(|| format!("Unknown `mdet_step` value '{step_label}'."))?;

    let flags_raw = get_required(record, header_map, "mdet_flags")?;
    let flags = flags_raw
        .parse::<i64>()
        .map_err(|_| format!("Invalid `mdet_flags` value '{flags_raw}'."))?;

    let g1 = parse_f64(get_required(record, header_map, "gauss_g_1")?, "gauss_g_1")?;
    let g2 = parse_f64(get_required(record, header_map, "gauss_g_2")?, "gauss_g_2")?;

    let weight_inputs = WeightInputs {
        g_cov_1_1: parse_opt_f64(get_optional(record, header_map, "gauss_g_cov_1_1")),
        g_cov_2_2: parse_opt_f64(get_optional(record, header_map, "gauss_g_cov_2_2")),
    };

    Ok(ObjectRecord {
        x,
        y,
        step,
        flags,
        g1,
        g2,
        weight_inputs,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a float; `nan`/`inf` are accepted and handled downstream.
fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{s}'."))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
