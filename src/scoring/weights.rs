use serde::{Deserialize, Serialize};

use crate::models::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricWeight {
    pub metric: Metric,
    pub weight: f64,
    pub enabled: bool,
}

/// Weights behind the potential score. Only PF, ATV and win rate participate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialWeights {
    pub purchase_frequency: f64,
    pub avg_transaction_value: f64,
    pub win_rate: f64,
    /// Added instead of the win-rate term when the win-rate score is zero.
    pub zero_win_penalty: f64,
}

pub const EXCEL_MODULE_WEIGHTS: [(Metric, f64); 5] = [
    (Metric::DepositAmount, 0.30),
    (Metric::Ggr, 0.30),
    (Metric::PurchaseFrequency, 0.15),
    (Metric::AvgTransactionValue, 0.15),
    (Metric::WinRate, 0.10),
];

pub const EXCEL_POTENTIAL_WEIGHTS: PotentialWeights = PotentialWeights {
    purchase_frequency: 0.40,
    avg_transaction_value: 0.40,
    win_rate: 0.20,
    zero_win_penalty: -10.0,
};

pub fn default_weights() -> Vec<MetricWeight> {
    EXCEL_MODULE_WEIGHTS
        .iter()
        .map(|&(metric, weight)| MetricWeight { metric, weight, enabled: true })
        .collect()
}

impl Default for PotentialWeights {
    fn default() -> Self {
        EXCEL_POTENTIAL_WEIGHTS
    }
}

/// Sum of enabled weights. Conventionally 1.0, never enforced by the scorer.
pub fn enabled_total(weights: &[MetricWeight]) -> f64 {
    weights
        .iter()
        .filter(|w| w.enabled)
        .map(|w| w.weight)
        .sum()
}

pub fn validate(weights: &[MetricWeight], potential: &PotentialWeights) -> Result<(), String> {
    for (i, w) in weights.iter().enumerate() {
        if !w.weight.is_finite() {
            return Err(format!("Weight for {} is not finite", w.metric));
        }
        if weights[..i].iter().any(|prev| prev.metric == w.metric) {
            return Err(format!("Weight for {} configured more than once", w.metric));
        }
    }
    
    let potential_terms = [
        potential.purchase_frequency,
        potential.avg_transaction_value,
        potential.win_rate,
        potential.zero_win_penalty,
    ];
    if potential_terms.iter().any(|v| !v.is_finite()) {
        return Err("Potential weights must be finite".to_string());
    }
    
    Ok(())
}
