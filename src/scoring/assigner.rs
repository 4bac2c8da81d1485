use crate::config::TierSettings;
use crate::models::{Tier, TierBoundaries, TIER_COUNT, TIER_GROUPS, TIER_NAMES};

/// Tier for `score`: every cut point at or below the score moves it one tier up.
pub fn assign(score: f64, boundaries: &TierBoundaries) -> Tier {
    let passed = boundaries.cuts.iter().filter(|&&cut| cut <= score).count();
    Tier::clamped((TIER_COUNT - passed) as i64)
}

/// Assigns tiers and resolves their business labels.
#[derive(Debug, Clone)]
pub struct TierAssigner {
    names: Vec<String>,
    groups: Vec<String>,
}

impl Default for TierAssigner {
    fn default() -> Self {
        Self {
            names: TIER_NAMES.iter().map(|s| s.to_string()).collect(),
            groups: TIER_GROUPS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TierAssigner {
    pub fn new(settings: &TierSettings) -> Self {
        Self {
            names: settings.names.clone(),
            groups: settings.groups.clone(),
        }
    }
    
    pub fn assign(&self, score: f64, boundaries: &TierBoundaries) -> Tier {
        assign(score, boundaries)
    }
    
    pub fn name(&self, tier: Tier) -> &str {
        self.names
            .get(tier.index())
            .map(String::as_str)
            .unwrap_or(TIER_NAMES[tier.index()])
    }
    
    pub fn group(&self, tier: Tier) -> &str {
        self.groups
            .get(tier.index())
            .map(String::as_str)
            .unwrap_or(TIER_GROUPS[tier.index()])
    }
}
