use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Metric;

/// Per-metric scoring detail kept for transparency in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScoreDetail {
    pub label: String,
    pub raw_value: f64,
    /// `None` when the metric was excluded (non-finite input or an excluding zero fallback).
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub total_score: f64,
    pub potential_score: f64,
    pub breakdown: BTreeMap<Metric, MetricScoreDetail>,
}

impl CompositeScore {
    pub fn metric_score(&self, metric: Metric) -> Option<f64> {
        self.breakdown.get(&metric).and_then(|d| d.score)
    }
}

/// Round to 4 decimal places so scores compare equal across runs.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
