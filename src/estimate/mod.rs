//! Bias estimation.
//!
//! - `bias`: the response-calibrated `(m, c1, c2)` estimator
//! - `resample`: jackknife / bootstrap uncertainties around it

pub mod bias;
pub mod resample;

pub use bias::*;
pub use resample::*;
