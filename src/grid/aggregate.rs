//! Per-tile aggregation and plus/minus pairing.
//!
//! For one realization we produce a `TileTable` with a row for every cell,
//! holding the weighted g1/g2 means and weight sums per perturbation step.
//! Empty (cell, step) combinations are `None`. Two realizations of the same
//! tile are then merged row by row into a `PairedTileTable`.

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::domain::{
    CellStats, N_STEPS, ObjectRecord, PairedRow, PairedTileTable, RunConfig, StepMoments, TileTable,
};
use crate::error::AppError;
use crate::grid::binner::GridBinner;
use crate::io::catalog::{load_catalog, usable_records};
use crate::weights::ShearWeight;

/// Aggregate usable records of one realization into a full `ngrid²` table.
///
/// Records outside the grid domain are discarded.
pub fn aggregate_tile(records: &[ObjectRecord], binner: &GridBinner, weights: &dyn ShearWeight) -> TileTable {
    let n_cells = binner.cell_count();

    // Bucket once: slot = cell * N_STEPS + step.
    let mut buckets: Vec<Vec<&ObjectRecord>> = vec![Vec::new(); n_cells * N_STEPS];
    let mut discarded = 0usize;
    for r in records {
        match binner.cell_index(r.x, r.y) {
            Some(cell) => buckets[cell as usize * N_STEPS + r.step.index()].push(r),
            None => discarded += 1,
        }
    }
    if discarded > 0 {
        debug!("discarded {discarded} objects outside the grid domain");
    }

    let cells = (0..n_cells)
        .map(|cell| {
            let mut stats = CellStats::empty(cell as u32);
            for (step, slot) in stats.steps.iter_mut().enumerate() {
                *slot = step_moments(&buckets[cell * N_STEPS + step], weights);
            }
            stats
        })
        .collect();

    TileTable {
        ngrid: binner.ngrid(),
        cells,
    }
}

/// Weighted means of one selection; `None` if empty or if the weights carry no mass.
fn step_moments(selection: &[&ObjectRecord], weights: &dyn ShearWeight) -> Option<StepMoments> {
    if selection.is_empty() {
        return None;
    }

    let w = weights.weights(selection);
    let mut sum_w = 0.0;
    let mut sum_g1 = 0.0;
    let mut sum_g2 = 0.0;
    for (r, &wi) in selection.iter().zip(w.iter()) {
        sum_w += wi;
        sum_g1 += wi * r.g1;
        sum_g2 += wi * r.g2;
    }

    if !(sum_w.is_finite() && sum_w > 0.0) {
        return None;
    }

    Some(StepMoments {
        g1: sum_g1 / sum_w,
        g2: sum_g2 / sum_w,
        n: sum_w,
    })
}

/// Merge plus and minus tables of one tile.
///
/// Both tables must list the same cell indices in the same order; anything
/// else means the paired simulations were gridded differently.
pub fn pair_tables(tile: Arc<str>, plus: TileTable, minus: TileTable) -> Result<PairedTileTable, AppError> {
    if plus.ngrid != minus.ngrid
        || plus.cells.len() != minus.cells.len()
        || !plus.cell_indices().eq(minus.cell_indices())
    {
        return Err(AppError::new(
            4,
            format!(
                "Tile {tile}: plus/minus cell indices do not align (plus ngrid={} rows={}, minus ngrid={} rows={}).",
                plus.ngrid,
                plus.cells.len(),
                minus.ngrid,
                minus.cells.len(),
            ),
        ));
    }

    let ngrid = plus.ngrid;
    let rows = plus
        .cells
        .into_iter()
        .zip(minus.cells)
        .map(|(p, m)| PairedRow {
            tile: tile.clone(),
            cell: p.index,
            plus: p.steps,
            minus: m.steps,
        })
        .collect();

    Ok(PairedTileTable { tile, ngrid, rows })
}

/// Load, cut, grid and aggregate one realization catalog.
pub fn grid_file(path: &Path, binner: &GridBinner, weights: &dyn ShearWeight) -> Result<TileTable, AppError> {
    let records = load_catalog(path)?;
    let total = records.len();
    let records = usable_records(records);
    debug!("{}: {} of {total} objects pass flags", path.display(), records.len());
    Ok(aggregate_tile(&records, binner, weights))
}

/// Build the paired table for one tile from its two catalog paths.
pub fn grid_file_pair(
    tile: &str,
    plus_path: &Path,
    minus_path: &Path,
    config: &RunConfig,
    weights: &dyn ShearWeight,
) -> Result<PairedTileTable, AppError> {
    let binner = GridBinner::new(config.ngrid, config.domain_side)?;
    let plus = grid_file(plus_path, &binner, weights).map_err(|e| e.context(format!("tile {tile}")))?;
    let minus = grid_file(minus_path, &binner, weights).map_err(|e| e.context(format!("tile {tile}")))?;
    pair_tables(Arc::from(tile), plus, minus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Step, WeightInputs};
    use crate::weights::Uniform;

    fn obj(x: f64, y: f64, step: Step, g1: f64, g2: f64) -> ObjectRecord {
        ObjectRecord {
            x,
            y,
            step,
            flags: 0,
            g1,
            g2,
            weight_inputs: WeightInputs::default(),
        }
    }

    struct Fixed(Vec<f64>);

    impl ShearWeight for Fixed {
        fn weights(&self, records: &[&ObjectRecord]) -> Vec<f64> {
            self.0.iter().copied().cycle().take(records.len()).collect()
        }
    }

    #[test]
    fn table_has_ngrid_squared_rows_regardless_of_occupancy() {
        for ngrid in [1u32, 2, 3, 5] {
            let binner = GridBinner::new(ngrid, 10_000.0).unwrap();
            let empty = aggregate_tile(&[], &binner, &Uniform);
            assert_eq!(empty.cells.len(), (ngrid * ngrid) as usize);

            let one = aggregate_tile(&[obj(1.0, 1.0, Step::NoShear, 0.1, 0.0)], &binner, &Uniform);
            assert_eq!(one.cells.len(), (ngrid * ngrid) as usize);
            for (i, c) in one.cells.iter().enumerate() {
                assert_eq!(c.index as usize, i);
            }
        }
    }

    #[test]
    fn empty_combinations_are_missing() {
        let binner = GridBinner::new(2, 10_000.0).unwrap();
        let table = aggregate_tile(&[obj(1.0, 1.0, Step::OneP, 0.1, 0.2)], &binner, &Uniform);
        let cell0 = &table.cells[0];
        assert!(cell0.steps[Step::NoShear.index()].is_none());
        let m = cell0.steps[Step::OneP.index()].unwrap();
        assert!((m.g1 - 0.1).abs() < 1e-15);
        assert!((m.g2 - 0.2).abs() < 1e-15);
        assert_eq!(m.n, 1.0);
        for c in &table.cells[1..] {
            assert!(c.steps.iter().all(Option::is_none));
        }
    }

    #[test]
    fn means_use_weights_and_n_is_weight_sum() {
        let binner = GridBinner::new(1, 10_000.0).unwrap();
        let records = [
            obj(10.0, 10.0, Step::NoShear, 0.1, -0.1),
            obj(20.0, 20.0, Step::NoShear, 0.4, 0.2),
        ];
        let table = aggregate_tile(&records, &binner, &Fixed(vec![1.0, 3.0]));
        let m = table.cells[0].steps[0].unwrap();
        assert!((m.g1 - (0.1 + 3.0 * 0.4) / 4.0).abs() < 1e-15);
        assert!((m.g2 - (-0.1 + 3.0 * 0.2) / 4.0).abs() < 1e-15);
        assert!((m.n - 4.0).abs() < 1e-15);
    }

    #[test]
    fn zero_weight_selection_is_missing() {
        let binner = GridBinner::new(1, 10_000.0).unwrap();
        let records = [obj(10.0, 10.0, Step::TwoM, 0.1, 0.1)];
        let table = aggregate_tile(&records, &binner, &Fixed(vec![0.0]));
        assert!(table.cells[0].steps[Step::TwoM.index()].is_none());
    }

    #[test]
    fn out_of_domain_objects_are_discarded() {
        let binner = GridBinner::new(1, 100.0).unwrap();
        let records = [
            obj(10.0, 10.0, Step::NoShear, 0.1, 0.0),
            obj(150.0, 10.0, Step::NoShear, 0.9, 0.0),
        ];
        let table = aggregate_tile(&records, &binner, &Uniform);
        let m = table.cells[0].steps[0].unwrap();
        assert_eq!(m.n, 1.0);
        assert!((m.g1 - 0.1).abs() < 1e-15);
    }

    #[test]
    fn pairing_keeps_both_realizations() {
        let binner = GridBinner::new(2, 10_000.0).unwrap();
        let plus = aggregate_tile(&[obj(1.0, 1.0, Step::NoShear, 0.02, 0.0)], &binner, &Uniform);
        let minus = aggregate_tile(&[obj(9_000.0, 9_000.0, Step::NoShear, -0.02, 0.0)], &binner, &Uniform);
        let paired = pair_tables(Arc::from("t0"), plus, minus).unwrap();

        assert_eq!(paired.rows.len(), 4);
        assert_eq!(paired.rows[0].plus[0].unwrap().g1, 0.02);
        assert!(paired.rows[0].minus[0].is_none());
        assert_eq!(paired.rows[3].minus[0].unwrap().g1, -0.02);
        assert!(paired.rows.iter().all(|r| &*r.tile == "t0"));
    }

    #[test]
    fn pairing_rejects_mismatched_grids() {
        let plus = aggregate_tile(&[], &GridBinner::new(2, 10_000.0).unwrap(), &Uniform);
        let minus = aggregate_tile(&[], &GridBinner::new(3, 10_000.0).unwrap(), &Uniform);
        let err = pair_tables(Arc::from("t0"), plus, minus).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn pairing_rejects_reordered_cells() {
        let binner = GridBinner::new(2, 10_000.0).unwrap();
        let plus = aggregate_tile(&[], &binner, &Uniform);
        let mut minus = plus.clone();
        minus.cells.reverse();
        let err = pair_tables(Arc::from("t0"), plus, minus).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("t0"));
    }
}
