use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{ActivitySource, TierStore};
use crate::driver::adapter::RawActivityRow;
use crate::models::{AssignmentKey, ReportingPeriod, Result, TierAssignment, TierEngineError};

/// In-process store for raw rows and tier assignments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<Vec<RawActivityRow>>>,
    assignments: Arc<RwLock<HashMap<AssignmentKey, TierAssignment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn with_rows(rows: Vec<RawActivityRow>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            assignments: Arc::default(),
        }
    }
    
    pub fn assignment_count(&self) -> usize {
        self.assignments.read().map(|a| a.len()).unwrap_or(0)
    }
    
    pub fn get(&self, key: &AssignmentKey) -> Option<TierAssignment> {
        self.assignments.read().ok()?.get(key).cloned()
    }
}

fn poisoned(what: &str) -> TierEngineError {
    TierEngineError::PersistenceError {
        batch: 0,
        message: format!("{} lock poisoned", what),
    }
}

#[async_trait]
impl TierStore for MemoryStore {
    async fn upsert_assignments(&self, batch: &[TierAssignment]) -> Result<usize> {
        let mut map = self.assignments.write().map_err(|_| poisoned("assignment"))?;
        for assignment in batch {
            map.insert(assignment.key(), assignment.clone());
        }
        Ok(batch.len())
    }
    
    async fn load_assignments(
        &self,
        period: ReportingPeriod,
        line: Option<String>,
    ) -> Result<Vec<TierAssignment>> {
        let map = self.assignments.read().map_err(|_| poisoned("assignment"))?;
        let mut found: Vec<TierAssignment> = map
            .values()
            .filter(|a| a.period == period)
            .filter(|a| line.as_deref().map_or(true, |l| a.line.eq_ignore_ascii_case(l.trim())))
            .cloned()
            .collect();
        
        found.sort_by(|a, b| (&a.line, &a.customer_id).cmp(&(&b.line, &b.customer_id)));
        Ok(found)
    }
}

#[async_trait]
impl ActivitySource for MemoryStore {
    async fn fetch_rows(
        &self,
        period: ReportingPeriod,
        line: Option<String>,
    ) -> Result<Vec<RawActivityRow>> {
        let rows = self.rows.read().map_err(|_| poisoned("row"))?;
        
        // Rows missing their period columns are passed through so the driver can report them.
        Ok(rows
            .iter()
            .filter(|r| match (r.year, r.month) {
                (Some(year), Some(month)) => period.contains(year, month),
                _ => true,
            })
            .filter(|r| match (&line, &r.line) {
                (Some(wanted), Some(actual)) => wanted.trim().eq_ignore_ascii_case(actual.trim()),
                _ => true,
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DerivedMetrics, Tier};
    use std::collections::BTreeMap;
    
    fn assignment(customer: &str, line: &str, tier: u8, score: f64) -> TierAssignment {
        TierAssignment {
            customer_id: customer.to_string(),
            line: line.to_string(),
            period: ReportingPeriod::month(2025, 1).unwrap(),
            tier: Tier::new(tier).unwrap(),
            tier_name: "x".to_string(),
            tier_group: "y".to_string(),
            score,
            potential_score: 0.0,
            metrics: DerivedMetrics::default(),
            breakdown: BTreeMap::new(),
        }
    }
    
    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let store = MemoryStore::new();
        store.upsert_assignments(&[assignment("a", "MYR", 3, 40.0)]).await.unwrap();
        store.upsert_assignments(&[assignment("a", "MYR", 1, 90.0)]).await.unwrap();
        
        assert_eq!(store.assignment_count(), 1);
        let stored = store.get(&assignment("a", "MYR", 1, 0.0).key()).unwrap();
        assert_eq!(stored.tier, Tier::BEST);
        assert_eq!(stored.score, 90.0);
    }
    
    #[tokio::test]
    async fn test_load_filters_and_orders() {
        let store = MemoryStore::new();
        store
            .upsert_assignments(&[
                assignment("b", "SGD", 2, 1.0),
                assignment("c", "MYR", 2, 1.0),
                assignment("a", "MYR", 2, 1.0),
            ])
            .await
            .unwrap();
        
        let period = ReportingPeriod::month(2025, 1).unwrap();
        let all = store.load_assignments(period, None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|a| a.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        
        let sgd = store.load_assignments(period, Some("sgd".to_string())).await.unwrap();
        assert_eq!(sgd.len(), 1);
        
        let other = store
            .load_assignments(ReportingPeriod::month(2025, 2).unwrap(), None)
            .await
            .unwrap();
        assert!(other.is_empty());
    }
    
    #[tokio::test]
    async fn test_fetch_rows_by_period_and_line() {
        let row = |month: u8, line: &str| RawActivityRow {
            customer: Some("u".to_string()),
            line: Some(line.to_string()),
            year: Some(2025),
            month: Some(month),
            ..Default::default()
        };
        let store = MemoryStore::with_rows(vec![
            row(1, "MYR"),
            row(2, "MYR"),
            row(4, "MYR"),
            row(2, "USC"),
        ]);
        
        let q1 = ReportingPeriod::quarter(2025, 1).unwrap();
        assert_eq!(store.fetch_rows(q1, None).await.unwrap().len(), 3);
        assert_eq!(store.fetch_rows(q1, Some("myr".to_string())).await.unwrap().len(), 2);
    }
}
