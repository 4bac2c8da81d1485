use serde::{Deserialize, Serialize};

use crate::models::Metric;

/// Anchor of a piecewise-linear scoring curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub value: f64,
    pub score: f64,
}

/// Result for a raw value that is zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroFallback {
    /// Score the metric as 0.
    Zero,
    /// Leave the metric unscored; it contributes nothing to the composite.
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCurveConfig {
    pub metric: Metric,
    pub label: String,
    pub zero_fallback: ZeroFallback,
    pub points: Vec<CurvePoint>,
}

type CurveRow = (Metric, &'static str, ZeroFallback, &'static [(f64, f64)]);

/// Calibrated business curves, one per scored metric.
pub const EXCEL_METRIC_CONFIGS: &[CurveRow] = &[
    (
        Metric::DepositAmount,
        "Deposit Amount",
        ZeroFallback::Zero,
        &[
            (100.0, 5.0),
            (500.0, 20.0),
            (1_000.0, 35.0),
            (5_000.0, 60.0),
            (10_000.0, 75.0),
            (50_000.0, 90.0),
            (100_000.0, 100.0),
        ],
    ),
    (
        Metric::Ggr,
        "GGR",
        ZeroFallback::Zero,
        &[
            (50.0, 5.0),
            (200.0, 20.0),
            (500.0, 35.0),
            (2_000.0, 60.0),
            (5_000.0, 75.0),
            (20_000.0, 90.0),
            (50_000.0, 100.0),
        ],
    ),
    (
        Metric::PurchaseFrequency,
        "Purchase Frequency",
        ZeroFallback::Zero,
        &[
            (0.5, 10.0),
            (1.0, 25.0),
            (2.0, 50.0),
            (3.0, 70.0),
            (5.0, 90.0),
            (8.0, 100.0),
        ],
    ),
    (
        Metric::AvgTransactionValue,
        "Average Transaction Value",
        ZeroFallback::Zero,
        &[
            (20.0, 5.0),
            (50.0, 20.0),
            (100.0, 40.0),
            (300.0, 65.0),
            (1_000.0, 85.0),
            (3_000.0, 100.0),
        ],
    ),
    (
        Metric::WinRate,
        "Win Rate",
        ZeroFallback::Zero,
        &[
            (5.0, 10.0),
            (10.0, 25.0),
            (20.0, 50.0),
            (35.0, 75.0),
            (50.0, 90.0),
            (70.0, 100.0),
        ],
    ),
];

pub fn default_curves() -> Vec<MetricCurveConfig> {
    EXCEL_METRIC_CONFIGS
        .iter()
        .map(|(metric, label, zero_fallback, points)| MetricCurveConfig {
            metric: *metric,
            label: label.to_string(),
            zero_fallback: *zero_fallback,
            points: points
                .iter()
                .map(|&(value, score)| CurvePoint { value, score })
                .collect(),
        })
        .collect()
}
