//! Response-calibrated shear bias estimator.
//!
//! For each realization (`_p`, `_m`) the per-cell statistics are combined into
//! weighted means over all rows, skipping missing and NaN terms:
//!
//! ```text
//! g1    = Σ(g1·n) / Σn                  (noshear)
//! R11   = (g1[1p] - g1[1m]) / 0.02
//! R22   = (g2[2p] - g2[2m]) / 0.02
//! ```
//!
//! and the bias triple is
//!
//! ```text
//! m  = (g1_p - g1_m) / (R11_p + R11_m) / 0.02 - 1
//! c1 = (g1_p + g1_m) / (R11_p + R11_m)
//! c2 = (g2_p + g2_m) / (R22_p + R22_m)
//! ```
//!
//! The operation order above is part of the contract; do not simplify it.
//! Zero or all-missing denominators give non-finite components, no error.

use crate::domain::{BiasEstimate, N_STEPS, PairedRow, Realization, Step, StepStats};

/// Finite-difference step of the calibration shear (`1p` - `1m`).
pub const STEP_SIZE: f64 = 0.02;

/// NaN-skipping running ratio `Σ(v·n) / Σn`.
#[derive(Debug, Clone, Copy, Default)]
struct WeightedSum {
    num: f64,
    den: f64,
}

impl WeightedSum {
    fn add(&mut self, value: f64, n: f64) {
        let term = value * n;
        if !term.is_nan() {
            self.num += term;
        }
        if !n.is_nan() {
            self.den += n;
        }
    }

    fn mean(&self) -> f64 {
        self.num / self.den
    }
}

/// Per-step g1/g2 sums for one realization.
#[derive(Debug, Clone, Copy, Default)]
struct RealizationSums {
    g1: [WeightedSum; N_STEPS],
    g2: [WeightedSum; N_STEPS],
}

impl RealizationSums {
    fn add(&mut self, stats: &StepStats) {
        for (i, slot) in stats.iter().enumerate() {
            if let Some(m) = slot {
                self.g1[i].add(m.g1, m.n);
                self.g2[i].add(m.g2, m.n);
            }
        }
    }

    fn calibrate(&self) -> Calibrated {
        let g1 = self.g1[Step::NoShear.index()].mean();
        let g1p = self.g1[Step::OneP.index()].mean();
        let g1m = self.g1[Step::OneM.index()].mean();
        let r11 = (g1p - g1m) / STEP_SIZE;

        let g2 = self.g2[Step::NoShear.index()].mean();
        let g2p = self.g2[Step::TwoP.index()].mean();
        let g2m = self.g2[Step::TwoM.index()].mean();
        let r22 = (g2p - g2m) / STEP_SIZE;

        Calibrated { g1, g2, r11, r22 }
    }
}

/// Mean shears and responses of one realization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrated {
    pub g1: f64,
    pub g2: f64,
    pub r11: f64,
    pub r22: f64,
}

/// Estimate `(m, c1, c2)` over any selection of dataset rows.
///
/// Rows are visited once, in iteration order. Resamplers pass filtered or
/// index-mapped iterators instead of copying rows.
pub fn estimate_bias<'a, I>(rows: I) -> BiasEstimate
where
    I: IntoIterator<Item = &'a PairedRow>,
{
    let (plus, minus) = calibrate_rows(rows);
    combine(&plus, &minus)
}

/// Per-realization calibrated means for a selection of rows.
pub fn calibrate_rows<'a, I>(rows: I) -> (Calibrated, Calibrated)
where
    I: IntoIterator<Item = &'a PairedRow>,
{
    let mut plus = RealizationSums::default();
    let mut minus = RealizationSums::default();
    for row in rows {
        plus.add(row.stats(Realization::Plus));
        minus.add(row.stats(Realization::Minus));
    }
    (plus.calibrate(), minus.calibrate())
}

/// Combine plus and minus calibrations into the bias triple.
pub fn combine(p: &Calibrated, m: &Calibrated) -> BiasEstimate {
    BiasEstimate {
        m: (p.g1 - m.g1) / (p.r11 + m.r11) / STEP_SIZE - 1.0,
        c1: (p.g1 + m.g1) / (p.r11 + m.r11),
        c2: (p.g2 + m.g2) / (p.r22 + m.r22),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::StepMoments;

    fn moments(g1: f64, g2: f64) -> Option<StepMoments> {
        Some(StepMoments { g1, g2, n: 1.0 })
    }

    /// Unit-response stats with the given noshear g1.
    pub(crate) fn unit_response(g1_noshear: f64) -> StepStats {
        [
            moments(g1_noshear, 0.0),
            moments(0.01, 0.0),
            moments(-0.01, 0.0),
            moments(0.0, 0.01),
            moments(0.0, -0.01),
        ]
    }

    pub(crate) fn row(tile: &str, plus_g1: f64, minus_g1: f64) -> PairedRow {
        PairedRow {
            tile: Arc::from(tile),
            cell: 0,
            plus: unit_response(plus_g1),
            minus: unit_response(minus_g1),
        }
    }

    #[test]
    fn zero_net_shear_gives_minus_one() {
        let rows = vec![row("a", 0.0, 0.0), row("b", 0.0, 0.0)];
        let (p, m) = calibrate_rows(&rows);
        assert_eq!(p.r11, 1.0);
        assert_eq!(m.r22, 1.0);

        let est = estimate_bias(&rows);
        assert_eq!(est.m, -1.0);
        assert_eq!(est.c1, 0.0);
        assert_eq!(est.c2, 0.0);
    }

    #[test]
    fn injected_shear_scenario() {
        let rows = vec![row("a", 0.0004, -0.0004), row("b", 0.0004, -0.0004)];
        let est = estimate_bias(&rows);
        assert!((est.m - (-0.98)).abs() < 1e-12, "m = {}", est.m);
        assert!(est.c1.abs() < 1e-15);
        assert_eq!(est.c2, 0.0);
    }

    #[test]
    fn calibrated_shear_recovers_true_bias() {
        // g_meas = (1 + m) * g_true with R = 1, g_true = ±0.02.
        let m_true = 0.01;
        let g = (1.0 + m_true) * 0.02;
        let rows = vec![row("a", g + 0.001, -g + 0.001)];
        let est = estimate_bias(&rows);
        assert!((est.m - m_true).abs() < 1e-12);
        assert!((est.c1 - 0.001).abs() < 1e-12);
    }

    #[test]
    fn all_missing_row_changes_nothing() {
        let rows = vec![row("a", 0.0003, -0.0005), row("b", 0.0001, -0.0002)];
        let mut with_missing = rows.clone();
        with_missing.insert(1, PairedRow::missing(Arc::from("c"), 0));

        let a = estimate_bias(&rows);
        let b = estimate_bias(&with_missing);
        assert_eq!(a, b);
    }

    #[test]
    fn nan_terms_are_skipped() {
        let rows = vec![row("a", 0.0003, -0.0005)];
        let mut with_nan = rows.clone();
        let mut extra = row("b", f64::NAN, -0.0005);
        extra.minus = [None; N_STEPS];
        extra.plus[0] = Some(StepMoments { g1: f64::NAN, g2: f64::NAN, n: f64::NAN });
        extra.plus[1..].iter_mut().for_each(|s| *s = None);
        with_nan.push(extra);

        assert_eq!(estimate_bias(&rows), estimate_bias(&with_nan));
    }

    #[test]
    fn degenerate_denominators_are_silent() {
        let empty: Vec<PairedRow> = Vec::new();
        let est = estimate_bias(&empty);
        assert!(est.m.is_nan() && est.c1.is_nan() && est.c2.is_nan());

        // Identical 1p/1m means -> zero response -> infinite or NaN bias.
        let mut flat = row("a", 0.001, 0.002);
        flat.plus[Step::OneP.index()] = moments(0.0, 0.0);
        flat.plus[Step::OneM.index()] = moments(0.0, 0.0);
        flat.minus[Step::OneP.index()] = moments(0.0, 0.0);
        flat.minus[Step::OneM.index()] = moments(0.0, 0.0);
        let est = estimate_bias(std::iter::once(&flat));
        assert!(!est.m.is_finite());
        assert!(!est.c1.is_finite());
        assert!(est.c2.is_finite());
    }
}
