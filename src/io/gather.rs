//! Discovery of paired catalogs under a simulation output directory.
//!
//! Expected layout:
//!
//! ```text
//! <root>/<tile>/plus/<catalog>.csv
//! <root>/<tile>/minus/<catalog>.csv
//! ```
//!
//! If a realization directory holds several CSV files the first one in name
//! order is used. Tiles missing either realization are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::domain::Realization;
use crate::error::AppError;

/// Catalog paths of one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPair {
    pub plus: PathBuf,
    pub minus: PathBuf,
}

/// Map tile id -> paired catalog paths, in tile-name order.
pub fn gather_catalogs(root: &Path) -> Result<BTreeMap<String, CatalogPair>, AppError> {
    let entries = fs::read_dir(root)
        .map_err(|e| AppError::new(2, format!("Failed to read simulation directory '{}': {e}", root.display())))?;

    let mut tile_dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", root.display())))?;
        let path = entry.path();
        if path.is_dir() {
            tile_dirs.push(path);
        }
    }
    tile_dirs.sort();

    let mut catalogs = BTreeMap::new();
    for dir in tile_dirs {
        let Some(tile) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        let plus = find_catalog(&dir.join(Realization::Plus.dir_name()))?;
        let minus = find_catalog(&dir.join(Realization::Minus.dir_name()))?;
        match (plus, minus) {
            (Some(plus), Some(minus)) => {
                catalogs.insert(tile, CatalogPair { plus, minus });
            }
            (None, None) => {}
            (Some(_), None) => warn!("tile {tile}: no minus catalog, skipping"),
            (None, Some(_)) => warn!("tile {tile}: no plus catalog, skipping"),
        }
    }

    Ok(catalogs)
}

fn find_catalog(dir: &Path) -> Result<Option<PathBuf>, AppError> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let entries =
        fs::read_dir(dir).map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", dir.display())))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", dir.display())))?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            found.push(path);
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}
