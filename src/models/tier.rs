use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{DerivedMetrics, Metric, MetricScoreDetail, ReportingPeriod};

pub const TIER_COUNT: usize = 7;

pub const TIER_NAMES: [&str; TIER_COUNT] = [
    "Diamond",
    "Platinum",
    "Gold",
    "Silver",
    "Bronze",
    "Regular",
    "Dormant",
];

pub const TIER_GROUPS: [&str; TIER_COUNT] = [
    "High Value",
    "High Value",
    "Medium Value",
    "Medium Value",
    "Low Value",
    "Low Value",
    "Reactivation",
];

/// Ordinal tier, 1 (best) through 7 (worst).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tier(u8);

impl Tier {
    pub const BEST: Tier = Tier(1);
    pub const WORST: Tier = Tier(TIER_COUNT as u8);
    
    pub fn new(number: u8) -> Option<Self> {
        if (1..=TIER_COUNT as u8).contains(&number) {
            Some(Tier(number))
        } else {
            None
        }
    }
    
    pub fn clamped(number: i64) -> Self {
        Tier(number.clamp(1, TIER_COUNT as i64) as u8)
    }
    
    pub fn number(&self) -> u8 {
        self.0
    }
    
    /// Zero-based position into the label tables.
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
    
    pub fn all() -> impl Iterator<Item = Tier> {
        (1..=TIER_COUNT as u8).map(Tier)
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;
    
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Tier::new(value).ok_or_else(|| format!("tier {} outside 1..={}", value, TIER_COUNT))
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six non-decreasing cut points splitting a cohort into seven tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBoundaries {
    pub cuts: [f64; TIER_COUNT - 1],
}

impl TierBoundaries {
    /// All cut points equal: every score lands in the same tier.
    pub fn degenerate(at: f64) -> Self {
        Self { cuts: [at; TIER_COUNT - 1] }
    }
    
    pub fn is_degenerate(&self) -> bool {
        self.cuts.windows(2).all(|w| w[0] == w[1])
    }
}

/// Identity a tier assignment is upserted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub customer_id: String,
    pub line: String,
    pub period: ReportingPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssignment {
    pub customer_id: String,
    pub line: String,
    pub period: ReportingPeriod,
    pub tier: Tier,
    pub tier_name: String,
    pub tier_group: String,
    pub score: f64,
    pub potential_score: f64,
    pub metrics: DerivedMetrics,
    pub breakdown: BTreeMap<Metric, MetricScoreDetail>,
}

impl TierAssignment {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            customer_id: self.customer_id.clone(),
            line: self.line.clone(),
            period: self.period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_tier_range() {
        assert_eq!(Tier::new(0), None);
        assert_eq!(Tier::new(8), None);
        assert_eq!(Tier::new(1), Some(Tier::BEST));
        assert_eq!(Tier::clamped(-3), Tier::BEST);
        assert_eq!(Tier::clamped(42), Tier::WORST);
        assert_eq!(Tier::all().count(), TIER_COUNT);
    }
    
    #[test]
    fn test_tier_serde_rejects_out_of_range() {
        assert_eq!(serde_json::to_string(&Tier::WORST).unwrap(), "7");
        assert!(serde_json::from_str::<Tier>("3").is_ok());
        assert!(serde_json::from_str::<Tier>("9").is_err());
    }
    
    #[test]
    fn test_degenerate_boundaries() {
        assert!(TierBoundaries::degenerate(0.0).is_degenerate());
        let b = TierBoundaries { cuts: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] };
        assert!(!b.is_degenerate());
    }
}
