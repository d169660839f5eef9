//! Spatial gridding of catalogs.
//!
//! - `binner`: position -> cell index
//! - `aggregate`: per-tile weighted statistics and plus/minus pairing

pub mod aggregate;
pub mod binner;

pub use aggregate::*;
pub use binner::*;
