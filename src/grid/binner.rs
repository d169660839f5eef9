//! Spatial grid binning.
//!
//! The image domain is a square of side `domain_side` split into `ngrid × ngrid`
//! cells. Cells are numbered row-major from the origin:
//!
//! ```text
//! gind = floor(y / dgrid) * ngrid + floor(x / dgrid),   dgrid = domain_side / ngrid
//! ```
//!
//! Positions outside `[0, domain_side)` on either axis have no cell; callers
//! discard those objects.

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBinner {
    ngrid: u32,
    dgrid: f64,
    domain_side: f64,
}

impl GridBinner {
    pub fn new(ngrid: u32, domain_side: f64) -> Result<Self, AppError> {
        if ngrid == 0 {
            return Err(AppError::new(2, "Grid size must be >= 1."));
        }
        if !(domain_side.is_finite() && domain_side > 0.0) {
            return Err(AppError::new(
                2,
                format!("Invalid domain size: {domain_side} (must be finite and > 0)."),
            ));
        }
        if u64::from(ngrid) * u64::from(ngrid) > u64::from(u32::MAX) {
            return Err(AppError::new(2, format!("Grid size {ngrid} is too large.")));
        }
        Ok(Self {
            ngrid,
            dgrid: domain_side / f64::from(ngrid),
            domain_side,
        })
    }

    pub fn ngrid(&self) -> u32 {
        self.ngrid
    }

    /// Total number of cells (`ngrid²`).
    pub fn cell_count(&self) -> usize {
        self.ngrid as usize * self.ngrid as usize
    }

    /// Cell index for a position, or `None` when it lies outside the domain.
    pub fn cell_index(&self, x: f64, y: f64) -> Option<u32> {
        let inside = |v: f64| v.is_finite() && v >= 0.0 && v < self.domain_side;
        if !(inside(x) && inside(y)) {
            return None;
        }

        let xind = (x / self.dgrid).floor() as u32;
        let yind = (y / self.dgrid).floor() as u32;
        // Rounding in `v / dgrid` can land exactly on `ngrid` for v just below the edge.
        if xind >= self.ngrid || yind >= self.ngrid {
            return None;
        }
        Some(yind * self.ngrid + xind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_grid_maps_everything_to_zero() {
        let b = GridBinner::new(1, 10_000.0).unwrap();
        assert_eq!(b.cell_count(), 1);
        assert_eq!(b.cell_index(0.0, 0.0), Some(0));
        assert_eq!(b.cell_index(9_999.9, 5_000.0), Some(0));
    }

    #[test]
    fn cells_are_row_major() {
        let b = GridBinner::new(4, 10_000.0).unwrap();
        assert_eq!(b.cell_index(100.0, 100.0), Some(0));
        assert_eq!(b.cell_index(2_600.0, 100.0), Some(1));
        assert_eq!(b.cell_index(100.0, 2_600.0), Some(4));
        assert_eq!(b.cell_index(9_999.0, 9_999.0), Some(15));
        // Lower cell edges belong to the upper cell.
        assert_eq!(b.cell_index(2_500.0, 0.0), Some(1));
    }

    #[test]
    fn out_of_domain_positions_have_no_cell() {
        let b = GridBinner::new(3, 10_000.0).unwrap();
        assert_eq!(b.cell_index(-0.1, 10.0), None);
        assert_eq!(b.cell_index(10.0, 10_000.0), None);
        assert_eq!(b.cell_index(f64::NAN, 10.0), None);
        assert_eq!(b.cell_index(10.0, f64::INFINITY), None);
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert_eq!(GridBinner::new(0, 10_000.0).unwrap_err().exit_code(), 2);
        assert!(GridBinner::new(2, 0.0).is_err());
        assert!(GridBinner::new(2, f64::NAN).is_err());
    }
}
