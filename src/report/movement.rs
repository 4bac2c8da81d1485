use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ReportingPeriod, Tier, TierAssignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Upgraded,
    Downgraded,
    Unchanged,
    New,
    Lapsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMovement {
    pub customer_id: String,
    pub line: String,
    pub from: Option<Tier>,
    pub to: Option<Tier>,
    pub kind: MovementKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementReport {
    pub from_period: ReportingPeriod,
    pub to_period: ReportingPeriod,
    pub counts: BTreeMap<MovementKind, usize>,
    pub movements: Vec<TierMovement>,
}

fn classify(from: Option<Tier>, to: Option<Tier>) -> MovementKind {
    match (from, to) {
        (None, _) => MovementKind::New,
        (_, None) => MovementKind::Lapsed,
        // Lower tier numbers are better.
        (Some(f), Some(t)) if t < f => MovementKind::Upgraded,
        (Some(f), Some(t)) if t > f => MovementKind::Downgraded,
        _ => MovementKind::Unchanged,
    }
}

/// Compare tiers of the same (line, customer) across two periods.
pub fn compare_periods(
    from_period: ReportingPeriod,
    previous: &[TierAssignment],
    to_period: ReportingPeriod,
    current: &[TierAssignment],
) -> MovementReport {
    let index = |set: &[TierAssignment]| -> BTreeMap<(String, String), Tier> {
        set.iter()
            .map(|a| ((a.line.clone(), a.customer_id.clone()), a.tier))
            .collect()
    };
    let before = index(previous);
    let after = index(current);
    
    let keys: BTreeSet<&(String, String)> = before.keys().chain(after.keys()).collect();
    let mut counts = BTreeMap::new();
    let mut movements = Vec::with_capacity(keys.len());
    
    for key in keys {
        let from = before.get(key).copied();
        let to = after.get(key).copied();
        let kind = classify(from, to);
        *counts.entry(kind).or_insert(0) += 1;
        
        movements.push(TierMovement {
            customer_id: key.1.clone(),
            line: key.0.clone(),
            from,
            to,
            kind,
        });
    }
    
    MovementReport {
        from_period,
        to_period,
        counts,
        movements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DerivedMetrics;
    
    fn at(period: ReportingPeriod, customer: &str, tier: u8) -> TierAssignment {
        TierAssignment {
            customer_id: customer.to_string(),
            line: "SGD".to_string(),
            period,
            tier: Tier::new(tier).unwrap(),
            tier_name: String::new(),
            tier_group: String::new(),
            score: 0.0,
            potential_score: 0.0,
            metrics: DerivedMetrics::default(),
            breakdown: BTreeMap::new(),
        }
    }
    
    #[test]
    fn test_movement_kinds() {
        let jan = ReportingPeriod::month(2025, 1).unwrap();
        let feb = ReportingPeriod::month(2025, 2).unwrap();
        let previous = vec![
            at(jan, "up", 4),
            at(jan, "down", 2),
            at(jan, "same", 3),
            at(jan, "gone", 5),
        ];
        let current = vec![
            at(feb, "up", 1),
            at(feb, "down", 6),
            at(feb, "same", 3),
            at(feb, "fresh", 7),
        ];
        
        let report = compare_periods(jan, &previous, feb, &current);
        let kind_of = |id: &str| {
            report
                .movements
                .iter()
                .find(|m| m.customer_id == id)
                .map(|m| m.kind)
        };
        
        assert_eq!(kind_of("up"), Some(MovementKind::Upgraded));
        assert_eq!(kind_of("down"), Some(MovementKind::Downgraded));
        assert_eq!(kind_of("same"), Some(MovementKind::Unchanged));
        assert_eq!(kind_of("gone"), Some(MovementKind::Lapsed));
        assert_eq!(kind_of("fresh"), Some(MovementKind::New));
        assert_eq!(report.movements.len(), 5);
        assert_eq!(report.counts.values().sum::<usize>(), 5);
    }
    
    #[test]
    fn test_counts_serialize_by_kind_name() {
        let jan = ReportingPeriod::month(2025, 1).unwrap();
        let report = compare_periods(jan, &[], jan, &[at(jan, "a", 1)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["counts"]["new"], 1);
    }
}
