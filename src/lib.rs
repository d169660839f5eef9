//! `shear-bias` library crate.
//!
//! The binary (`mbias`) is a thin wrapper around this library so that:
//!
//! - the estimator and resamplers are testable without spawning processes
//! - the gridding pipeline can be driven from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod grid;
pub mod io;
pub mod report;
pub mod weights;
