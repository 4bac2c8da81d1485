use serde::{Deserialize, Serialize};

use crate::models::{round4, Tier, TierAssignment};
use crate::scoring::TierAssigner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: Tier,
    pub name: String,
    pub group: String,
    pub count: usize,
    /// Fraction of the cohort in this tier, 0.0 for an empty cohort.
    pub share: f64,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub mean_score: Option<f64>,
}

/// How a cohort spread across the seven tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDistribution {
    pub total: usize,
    pub tiers: Vec<TierStats>,
}

impl TierDistribution {
    pub fn build<'a, I>(assignments: I, assigner: &TierAssigner) -> Self
    where
        I: IntoIterator<Item = &'a TierAssignment>,
    {
        let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); Tier::WORST.number() as usize];
        for assignment in assignments {
            buckets[assignment.tier.index()].push(assignment.score);
        }
        let total: usize = buckets.iter().map(Vec::len).sum();
        
        let tiers = Tier::all()
            .map(|tier| {
                let scores = &buckets[tier.index()];
                let count = scores.len();
                let (min_score, max_score, mean_score) = if scores.is_empty() {
                    (None, None, None)
                } else {
                    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let mean = scores.iter().sum::<f64>() / count as f64;
                    (Some(min), Some(max), Some(round4(mean)))
                };
                
                TierStats {
                    tier,
                    name: assigner.name(tier).to_string(),
                    group: assigner.group(tier).to_string(),
                    count,
                    share: if total == 0 { 0.0 } else { round4(count as f64 / total as f64) },
                    min_score,
                    max_score,
                    mean_score,
                }
            })
            .collect();
        
        Self { total, tiers }
    }
    
    pub fn count(&self, tier: Tier) -> usize {
        self.tiers
            .iter()
            .find(|s| s.tier == tier)
            .map(|s| s.count)
            .unwrap_or(0)
    }
}
