use tracing::debug;

use crate::models::{TierBoundaries, TIER_COUNT};

/// Equal-frequency calibration: cut `k` sits at the `k/7` quantile of the
/// sorted cohort scores, so each tier holds roughly a seventh of the cohort.
///
/// Tied scores are never split. A cut that would land inside a run of equal
/// scores moves up to the next distinct score, so the whole run stays in the
/// lower tier. When nothing higher exists the cut stays on the tied value.
///
/// An empty cohort yields degenerate boundaries at 0. A single customer sets
/// all six cuts to its own score and therefore lands in tier 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryCalibrator;

impl BoundaryCalibrator {
    pub fn new() -> Self {
        Self
    }
    
    pub fn calibrate(&self, scores: &[f64]) -> TierBoundaries {
        let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        if sorted.is_empty() {
            debug!("Empty cohort, using degenerate boundaries");
            return TierBoundaries::degenerate(0.0);
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        
        let n = sorted.len();
        let mut cuts = [0.0; TIER_COUNT - 1];
        for (k, cut) in cuts.iter_mut().enumerate() {
            let idx = ((k + 1) * n / TIER_COUNT).min(n - 1);
            *cut = match idx.checked_sub(1).map(|below| sorted[below]) {
                Some(floor) if sorted[idx] == floor => {
                    let next = sorted.partition_point(|&s| s <= floor);
                    sorted.get(next).copied().unwrap_or(floor)
                }
                _ => sorted[idx],
            };
        }
        
        debug!(cohort = n, ?cuts, "Calibrated tier boundaries");
        TierBoundaries { cuts }
    }
}
