//! Input/output helpers.
//!
//! - catalog CSV ingest + quality cut (`catalog`)
//! - paired catalog discovery (`gather`)
//! - report and dataset exports (`export`)

pub mod catalog;
pub mod export;
pub mod gather;

pub use catalog::*;
pub use export::*;
pub use gather::*;
