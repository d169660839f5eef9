//! Per-object shear weights.
//!
//! The aggregator treats weights as an oracle: given the objects of one
//! (cell, step) selection it asks for one non-negative weight per object.

use crate::domain::{ObjectRecord, WeightScheme};

/// Intrinsic shape noise per component used by inverse-variance weights.
pub const SHAPE_NOISE: f64 = 0.22;

pub trait ShearWeight: Send + Sync {
    /// One weight per record, in the same order.
    fn weights(&self, records: &[&ObjectRecord]) -> Vec<f64>;
}

/// All objects weigh 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl ShearWeight for Uniform {
    fn weights(&self, records: &[&ObjectRecord]) -> Vec<f64> {
        vec![1.0; records.len()]
    }
}

/// `w = 1 / (σ_e² + (cov11 + cov22) / 2)`.
///
/// Objects without covariance columns get `1 / σ_e²`. Negative or non-finite
/// measurement variances are ignored.
#[derive(Debug, Clone, Copy)]
pub struct InverseVariance {
    pub shape_noise: f64,
}

impl Default for InverseVariance {
    fn default() -> Self {
        Self {
            shape_noise: SHAPE_NOISE,
        }
    }
}

impl ShearWeight for InverseVariance {
    fn weights(&self, records: &[&ObjectRecord]) -> Vec<f64> {
        let sn2 = self.shape_noise * self.shape_noise;
        records
            .iter()
            .map(|r| {
                let wi = r.weight_inputs;
                let var = match (wi.g_cov_1_1, wi.g_cov_2_2) {
                    (Some(a), Some(b)) => (a + b) / 2.0,
                    (Some(a), None) | (None, Some(a)) => a,
                    (None, None) => 0.0,
                };
                let var = if var.is_finite() && var > 0.0 { var } else { 0.0 };
                1.0 / (sn2 + var)
            })
            .collect()
    }
}

/// Build the weight implementation selected on the command line.
pub fn weights_for(scheme: WeightScheme) -> Box<dyn ShearWeight> {
    match scheme {
        WeightScheme::Uniform => Box::new(Uniform),
        WeightScheme::InverseVariance => Box::new(InverseVariance::default()),
    }
}
