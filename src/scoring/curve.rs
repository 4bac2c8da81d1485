use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::{CurvePoint, MetricCurveConfig, ZeroFallback};
use crate::models::{round4, Metric};

/// Smallest score a positive value below the first anchor can receive.
pub const BELOW_DOMAIN_FLOOR: f64 = 0.01;

/// A curve after sanitising: finite points only, ascending by value, no duplicate values.
#[derive(Debug, Clone)]
pub struct SortedCurve {
    pub label: String,
    pub zero_fallback: ZeroFallback,
    points: Arc<[CurvePoint]>,
}

impl SortedCurve {
    pub fn from_config(config: &MetricCurveConfig) -> Self {
        let mut points: Vec<CurvePoint> = config
            .points
            .iter()
            .copied()
            .filter(|p| p.value.is_finite() && p.score.is_finite())
            .collect();
        
        let dropped = config.points.len() - points.len();
        if dropped > 0 {
            warn!(metric = %config.metric, dropped, "Ignoring non-finite curve points");
        }
        
        points.sort_by(|a, b| a.value.total_cmp(&b.value));
        points.dedup_by(|later, earlier| later.value == earlier.value);
        
        Self {
            label: config.label.clone(),
            zero_fallback: config.zero_fallback,
            points: points.into(),
        }
    }
    
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }
    
    /// Score a strictly positive, finite value against the curve.
    fn interpolate(&self, raw: f64) -> f64 {
        let points = self.points();
        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        
        if raw < first.value {
            if first.value <= 0.0 {
                return first.score;
            }
            return ((raw / first.value) * first.score).max(BELOW_DOMAIN_FLOOR);
        }
        
        if raw >= last.value {
            return last.score;
        }
        
        // first.value <= raw < last.value, so the split lands strictly inside the slice
        let idx = points.partition_point(|p| p.value <= raw);
        let left = &points[idx - 1];
        let right = &points[idx];
        
        left.score + ((raw - left.value) / (right.value - left.value)) * (right.score - left.score)
    }
}

/// Maps raw metric values onto 0-100 scores.
///
/// Curves are sanitised and sorted once at construction and shared by every
/// score call; the scorer is immutable afterwards.
#[derive(Debug, Clone)]
pub struct MetricScorer {
    curves: HashMap<Metric, SortedCurve>,
}

impl MetricScorer {
    pub fn new(configs: &[MetricCurveConfig]) -> Self {
        let curves = configs
            .iter()
            .map(|c| (c.metric, SortedCurve::from_config(c)))
            .collect();
        
        Self { curves }
    }
    
    pub fn curve(&self, metric: Metric) -> Option<&SortedCurve> {
        self.curves.get(&metric)
    }
    
    pub fn label(&self, metric: Metric) -> String {
        self.curve(metric)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| metric.code().to_string())
    }
    
    /// Score `raw` for `metric`.
    ///
    /// `None` means the metric contributes nothing: the value was not finite,
    /// or it was zero/negative and the metric's fallback excludes it. A metric
    /// without a configured curve scores 0.
    pub fn score(&self, metric: Metric, raw: f64) -> Option<f64> {
        if !raw.is_finite() {
            return None;
        }
        
        let curve = match self.curves.get(&metric) {
            Some(curve) => curve,
            None => return Some(0.0),
        };
        
        if raw <= 0.0 {
            return match curve.zero_fallback {
                ZeroFallback::Zero => Some(0.0),
                ZeroFallback::Exclude => None,
            };
        }
        
        Some(round4(curve.interpolate(raw)))
    }
}
