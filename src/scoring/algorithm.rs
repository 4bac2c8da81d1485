use std::collections::BTreeMap;

use crate::{
    config::ScoringSettings,
    models::{round4, CompositeScore, DerivedMetrics, Metric, MetricScoreDetail},
    scoring::{
        curve::MetricScorer,
        weights::{MetricWeight, PotentialWeights},
    },
};

/// Combines per-metric curve scores into the total and potential scores.
pub struct ScoringAlgorithm {
    scorer: MetricScorer,
    weights: Vec<MetricWeight>,
    potential: PotentialWeights,
}

impl ScoringAlgorithm {
    pub fn new(settings: &ScoringSettings) -> Self {
        Self::from_parts(
            MetricScorer::new(&settings.curves),
            settings.weights.clone(),
            settings.potential,
        )
    }
    
    pub fn from_parts(
        scorer: MetricScorer,
        weights: Vec<MetricWeight>,
        potential: PotentialWeights,
    ) -> Self {
        Self {
            scorer,
            weights,
            potential,
        }
    }
    
    pub fn scorer(&self) -> &MetricScorer {
        &self.scorer
    }
    
    pub fn calculate_score(&self, metrics: &DerivedMetrics) -> CompositeScore {
        let breakdown = self.calculate_breakdown(metrics);
        self.composite(breakdown)
    }
    
    pub fn calculate_breakdown(
        &self,
        metrics: &DerivedMetrics,
    ) -> BTreeMap<Metric, MetricScoreDetail> {
        Metric::ALL
            .iter()
            .map(|&metric| {
                let raw_value = metrics.value(metric);
                let detail = MetricScoreDetail {
                    label: self.scorer.label(metric),
                    raw_value,
                    score: self.scorer.score(metric, raw_value),
                };
                (metric, detail)
            })
            .collect()
    }
    
    /// Total and potential scores for an already scored breakdown.
    pub fn composite(&self, breakdown: BTreeMap<Metric, MetricScoreDetail>) -> CompositeScore {
        let score_of = |metric: Metric| {
            breakdown
                .get(&metric)
                .and_then(|d| d.score)
                .unwrap_or(0.0)
        };
        
        let total_score = self.sum_weighted(&score_of);
        let potential_score = self.calculate_potential(&score_of);
        
        CompositeScore {
            total_score,
            potential_score,
            breakdown,
        }
    }
    
    fn sum_weighted(&self, score_of: &impl Fn(Metric) -> f64) -> f64 {
        let total: f64 = self
            .weights
            .iter()
            .filter(|w| w.enabled)
            .map(|w| score_of(w.metric) * w.weight)
            .sum();
        
        round4(total)
    }
    
    fn calculate_potential(&self, score_of: &impl Fn(Metric) -> f64) -> f64 {
        let p = &self.potential;
        
        // Unscored win rate counts as zero and takes the penalty too.
        let win_score = score_of(Metric::WinRate);
        let win_contribution = if win_score == 0.0 {
            p.zero_win_penalty
        } else {
            win_score * p.win_rate
        };
        
        let potential = score_of(Metric::PurchaseFrequency) * p.purchase_frequency
            + score_of(Metric::AvgTransactionValue) * p.avg_transaction_value
            + win_contribution;
        
        round4(potential.clamp(0.0, 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CurvePoint, MetricCurveConfig, ZeroFallback};
    use crate::scoring::weights::EXCEL_POTENTIAL_WEIGHTS;
    
    fn linear_curve(metric: Metric, top: f64) -> MetricCurveConfig {
        MetricCurveConfig {
            metric,
            label: format!("{} label", metric.code()),
            zero_fallback: ZeroFallback::Zero,
            points: vec![
                CurvePoint { value: 0.0, score: 0.0 },
                CurvePoint { value: top, score: 100.0 },
            ],
        }
    }
    
    fn only(metric: Metric) -> Vec<MetricWeight> {
        Metric::ALL
            .iter()
            .map(|&m| MetricWeight { metric: m, weight: 1.0, enabled: m == metric })
            .collect()
    }
    
    fn da_only_algorithm() -> ScoringAlgorithm {
        let scorer = MetricScorer::new(&[MetricCurveConfig {
            metric: Metric::DepositAmount,
            label: "Deposit Amount".to_string(),
            zero_fallback: ZeroFallback::Zero,
            points: vec![
                CurvePoint { value: 0.0, score: 0.0 },
                CurvePoint { value: 1000.0, score: 50.0 },
                CurvePoint { value: 10000.0, score: 100.0 },
            ],
        }]);
        ScoringAlgorithm::from_parts(scorer, only(Metric::DepositAmount), EXCEL_POTENTIAL_WEIGHTS)
    }
    
    fn metrics_with_da(da: f64) -> DerivedMetrics {
        DerivedMetrics { deposit_amount: da, ..Default::default() }
    }
    
    #[test]
    fn test_single_metric_total() {
        let algo = da_only_algorithm();
        assert_eq!(algo.calculate_score(&metrics_with_da(500.0)).total_score, 25.0);
        assert_eq!(algo.calculate_score(&metrics_with_da(10000.0)).total_score, 100.0);
        assert_eq!(algo.calculate_score(&metrics_with_da(20000.0)).total_score, 100.0);
        assert_eq!(algo.calculate_score(&metrics_with_da(-10.0)).total_score, 0.0);
    }
    
    #[test]
    fn test_breakdown_keeps_label_and_raw_value() {
        let algo = da_only_algorithm();
        let score = algo.calculate_score(&metrics_with_da(500.0));
        
        assert_eq!(score.breakdown.len(), Metric::ALL.len());
        let da = &score.breakdown[&Metric::DepositAmount];
        assert_eq!(da.label, "Deposit Amount");
        assert_eq!(da.raw_value, 500.0);
        assert_eq!(da.score, Some(25.0));
        // Metrics without a curve fall back to their code as a label and score 0.
        assert_eq!(score.breakdown[&Metric::Ggr].label, "GGR");
        assert_eq!(score.metric_score(Metric::Ggr), Some(0.0));
    }
    
    #[test]
    fn test_excluded_metric_contributes_nothing() {
        let mut curve = linear_curve(Metric::Ggr, 100.0);
        curve.zero_fallback = ZeroFallback::Exclude;
        let scorer = MetricScorer::new(&[linear_curve(Metric::DepositAmount, 100.0), curve]);
        let weights = vec![
            MetricWeight { metric: Metric::DepositAmount, weight: 0.5, enabled: true },
            MetricWeight { metric: Metric::Ggr, weight: 0.5, enabled: true },
        ];
        let algo = ScoringAlgorithm::from_parts(scorer, weights, EXCEL_POTENTIAL_WEIGHTS);
        
        let score = algo.calculate_score(&DerivedMetrics {
            deposit_amount: 40.0,
            ggr: -3.0,
            ..Default::default()
        });
        assert_eq!(score.metric_score(Metric::Ggr), None);
        assert_eq!(score.total_score, 20.0);
    }
    
    fn potential_algorithm(potential: PotentialWeights) -> ScoringAlgorithm {
        let scorer = MetricScorer::new(&[
            linear_curve(Metric::PurchaseFrequency, 100.0),
            linear_curve(Metric::AvgTransactionValue, 100.0),
            linear_curve(Metric::WinRate, 100.0),
        ]);
        ScoringAlgorithm::from_parts(scorer, only(Metric::DepositAmount), potential)
    }
    
    #[test]
    fn test_potential_uses_pf_atv_and_win_rate() {
        let algo = potential_algorithm(EXCEL_POTENTIAL_WEIGHTS);
        let metrics = DerivedMetrics {
            purchase_frequency: 50.0,
            avg_transaction_value: 50.0,
            win_rate: 50.0,
            ..Default::default()
        };
        // 0.4 * 50 + 0.4 * 50 + 0.2 * 50
        assert_eq!(algo.calculate_score(&metrics).potential_score, 50.0);
    }
    
    #[test]
    fn test_zero_win_rate_is_penalised() {
        let algo = potential_algorithm(EXCEL_POTENTIAL_WEIGHTS);
        let metrics = DerivedMetrics {
            purchase_frequency: 50.0,
            avg_transaction_value: 50.0,
            win_rate: 0.0,
            ..Default::default()
        };
        assert_eq!(algo.calculate_score(&metrics).potential_score, 30.0);
    }
    
    #[test]
    fn test_potential_clamped() {
        let algo = potential_algorithm(EXCEL_POTENTIAL_WEIGHTS);
        assert_eq!(algo.calculate_score(&DerivedMetrics::default()).potential_score, 0.0);
        
        let heavy = PotentialWeights {
            purchase_frequency: 1.0,
            avg_transaction_value: 1.0,
            win_rate: 1.0,
            zero_win_penalty: -10.0,
        };
        let algo = potential_algorithm(heavy);
        let metrics = DerivedMetrics {
            purchase_frequency: 100.0,
            avg_transaction_value: 100.0,
            win_rate: 100.0,
            ..Default::default()
        };
        assert_eq!(algo.calculate_score(&metrics).potential_score, 100.0);
    }
}
