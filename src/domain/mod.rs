//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - catalog objects and perturbation steps (`ObjectRecord`, `Step`)
//! - grid statistics (`StepMoments`, `TileTable`, `PairedRow`, `Dataset`)
//! - run configuration and outputs (`RunConfig`, `BiasEstimate`, `BiasReport`)

pub mod types;

pub use types::*;
