use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::{ActivitySource, TierStore};
use crate::config::DatabaseSettings;
use crate::driver::adapter::RawActivityRow;
use crate::models::{ActivityRecord, ReportingPeriod, Result, Tier, TierAssignment, TierEngineError};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customer_activity (
        customer_id TEXT NOT NULL,
        line TEXT NOT NULL,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        deposit_cases INTEGER NOT NULL DEFAULT 0,
        deposit_amount TEXT NOT NULL DEFAULT '0',
        withdraw_cases INTEGER NOT NULL DEFAULT 0,
        withdraw_amount TEXT NOT NULL DEFAULT '0',
        ggr TEXT,
        active_days INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_customer_activity_period
        ON customer_activity (year, month, line)",
    "CREATE TABLE IF NOT EXISTS tier_assignments (
        customer_id TEXT NOT NULL,
        line TEXT NOT NULL,
        year INTEGER NOT NULL,
        period_kind TEXT NOT NULL,
        period_index INTEGER NOT NULL,
        tier INTEGER NOT NULL,
        tier_name TEXT NOT NULL,
        tier_group TEXT NOT NULL,
        score REAL NOT NULL,
        potential_score REAL NOT NULL,
        metrics TEXT NOT NULL,
        breakdown TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (customer_id, line, year, period_kind, period_index)
    )",
];

const UPSERT: &str = "INSERT INTO tier_assignments (
        customer_id, line, year, period_kind, period_index, tier, tier_name, tier_group,
        score, potential_score, metrics, breakdown, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (customer_id, line, year, period_kind, period_index) DO UPDATE SET
        tier = excluded.tier,
        tier_name = excluded.tier_name,
        tier_group = excluded.tier_group,
        score = excluded.score,
        potential_score = excluded.potential_score,
        metrics = excluded.metrics,
        breakdown = excluded.breakdown,
        updated_at = excluded.updated_at";

/// SQLite-backed activity source and tier store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(settings.connect_timeout_seconds))
            .connect_with(options)
            .await?;
        
        info!(url = %settings.url, "Connected to tier database");
        Self::from_pool(pool).await
    }
    
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }
    
    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
    
    /// Load normalised activity records, e.g. when importing a source extract.
    pub async fn insert_activity(&self, records: &[ActivityRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for r in records {
            sqlx::query(
                "INSERT INTO customer_activity (
                    customer_id, line, year, month, deposit_cases, deposit_amount,
                    withdraw_cases, withdraw_amount, ggr, active_days
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&r.customer_id)
            .bind(&r.line)
            .bind(r.year)
            .bind(r.month as i64)
            .bind(r.deposit_cases as i64)
            .bind(r.deposit_amount.to_string())
            .bind(r.withdraw_cases as i64)
            .bind(r.withdraw_amount.to_string())
            .bind(r.ggr.to_string())
            .bind(r.active_days as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Option<Decimal>> {
    let text: Option<String> = row.try_get(column)?;
    Ok(text.and_then(|t| match Decimal::from_str(t.trim()) {
        Ok(d) => Some(d),
        Err(e) => {
            warn!(column, value = %t, error = %e, "Unparseable amount, treating as missing");
            None
        }
    }))
}

fn activity_from_row(row: &SqliteRow) -> Result<RawActivityRow> {
    let month: i64 = row.try_get("month")?;
    let deposit_cases: i64 = row.try_get("deposit_cases")?;
    let withdraw_cases: i64 = row.try_get("withdraw_cases")?;
    let active_days: i64 = row.try_get("active_days")?;
    
    Ok(RawActivityRow {
        customer: row.try_get("customer_id")?,
        line: row.try_get("line")?,
        year: row.try_get("year")?,
        month: u8::try_from(month).ok(),
        deposit_cases: Some(deposit_cases as f64),
        deposit_amount: decimal_column(row, "deposit_amount")?,
        withdraw_cases: Some(withdraw_cases as f64),
        withdraw_amount: decimal_column(row, "withdraw_amount")?,
        ggr: decimal_column(row, "ggr")?,
        net_profit: None,
        active_days: u32::try_from(active_days).ok(),
    })
}

fn assignment_from_row(row: &SqliteRow) -> Result<TierAssignment> {
    let year: i32 = row.try_get("year")?;
    let kind: String = row.try_get("period_kind")?;
    let index: i64 = row.try_get("period_index")?;
    let period = ReportingPeriod::from_parts(year, &kind, index as u8)?;
    
    let tier_number: i64 = row.try_get("tier")?;
    let tier = u8::try_from(tier_number)
        .ok()
        .and_then(Tier::new)
        .ok_or_else(|| {
            TierEngineError::MalformedRow(format!("stored tier {} out of range", tier_number))
        })?;
    
    let metrics: String = row.try_get("metrics")?;
    let breakdown: String = row.try_get("breakdown")?;
    
    Ok(TierAssignment {
        customer_id: row.try_get("customer_id")?,
        line: row.try_get("line")?,
        period,
        tier,
        tier_name: row.try_get("tier_name")?,
        tier_group: row.try_get("tier_group")?,
        score: row.try_get("score")?,
        potential_score: row.try_get("potential_score")?,
        metrics: serde_json::from_str(&metrics)?,
        breakdown: serde_json::from_str(&breakdown)?,
    })
}

#[async_trait]
impl TierStore for SqliteStore {
    async fn upsert_assignments(&self, batch: &[TierAssignment]) -> Result<usize> {
        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        
        for a in batch {
            sqlx::query(UPSERT)
                .bind(&a.customer_id)
                .bind(&a.line)
                .bind(a.period.year)
                .bind(a.period.kind())
                .bind(a.period.index() as i64)
                .bind(a.tier.number() as i64)
                .bind(&a.tier_name)
                .bind(&a.tier_group)
                .bind(a.score)
                .bind(a.potential_score)
                .bind(serde_json::to_string(&a.metrics)?)
                .bind(serde_json::to_string(&a.breakdown)?)
                .bind(&updated_at)
                .execute(&mut *tx)
                .await?;
        }
        
        tx.commit().await?;
        Ok(batch.len())
    }
    
    async fn load_assignments(
        &self,
        period: ReportingPeriod,
        line: Option<String>,
    ) -> Result<Vec<TierAssignment>> {
        let rows = sqlx::query(
            "SELECT * FROM tier_assignments
             WHERE year = ? AND period_kind = ? AND period_index = ?
               AND (? IS NULL OR UPPER(line) = UPPER(TRIM(?)))
             ORDER BY line, customer_id",
        )
        .bind(period.year)
        .bind(period.kind())
        .bind(period.index() as i64)
        .bind(line.as_deref())
        .bind(line.as_deref())
        .fetch_all(&self.pool)
        .await?;
        
        rows.iter().map(assignment_from_row).collect()
    }
}

#[async_trait]
impl ActivitySource for SqliteStore {
    async fn fetch_rows(
        &self,
        period: ReportingPeriod,
        line: Option<String>,
    ) -> Result<Vec<RawActivityRow>> {
        let months = period.months();
        let rows = sqlx::query(
            "SELECT * FROM customer_activity
             WHERE year = ? AND month BETWEEN ? AND ?
               AND (? IS NULL OR UPPER(line) = UPPER(TRIM(?)))
             ORDER BY line, customer_id, month",
        )
        .bind(period.year)
        .bind(*months.start() as i64)
        .bind(*months.end() as i64)
        .bind(line.as_deref())
        .bind(line.as_deref())
        .fetch_all(&self.pool)
        .await?;
        
        rows.iter().map(activity_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DerivedMetrics;
    use std::collections::BTreeMap;
    
    async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteStore::from_pool(pool).await.unwrap()
    }
    
    fn assignment(customer: &str, tier: u8, score: f64) -> TierAssignment {
        TierAssignment {
            customer_id: customer.to_string(),
            line: "MYR".to_string(),
            period: ReportingPeriod::quarter(2025, 2).unwrap(),
            tier: Tier::new(tier).unwrap(),
            tier_name: "Gold".to_string(),
            tier_group: "Medium Value".to_string(),
            score,
            potential_score: 12.5,
            metrics: DerivedMetrics { deposit_amount: 100.0, ..Default::default() },
            breakdown: BTreeMap::new(),
        }
    }
    
    #[tokio::test]
    async fn test_upsert_overwrites_in_place() {
        let store = memory_store().await;
        let period = ReportingPeriod::quarter(2025, 2).unwrap();
        
        let batch = [assignment("a", 3, 40.0), assignment("b", 5, 10.0)];
        assert_eq!(store.upsert_assignments(&batch).await.unwrap(), 2);
        store.upsert_assignments(&[assignment("a", 1, 95.0)]).await.unwrap();
        
        let loaded = store.load_assignments(period, None).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].customer_id, "a");
        assert_eq!(loaded[0].tier, Tier::BEST);
        assert_eq!(loaded[0].score, 95.0);
        assert_eq!(loaded[0].metrics.deposit_amount, 100.0);
        
        let other_line = store.load_assignments(period, Some("SGD".to_string())).await.unwrap();
        assert!(other_line.is_empty());
    }
    
    #[tokio::test]
    async fn test_line_filter_ignores_case() {
        let store = memory_store().await;
        let period = ReportingPeriod::quarter(2025, 2).unwrap();
        store.upsert_assignments(&[assignment("a", 2, 50.0)]).await.unwrap();
        
        let lower = store.load_assignments(period, Some("myr".to_string())).await.unwrap();
        assert_eq!(lower.len(), 1);
        
        let record = ActivityRecord {
            customer_id: "u1".to_string(),
            line: "MYR".to_string(),
            year: 2025,
            month: 5,
            deposit_cases: 1,
            deposit_amount: Decimal::ONE,
            withdraw_cases: 0,
            withdraw_amount: Decimal::ZERO,
            ggr: Decimal::ONE,
            active_days: 1,
        };
        store.insert_activity(&[record]).await.unwrap();
        let rows = store.fetch_rows(period, Some(" Myr ".to_string())).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
    
    #[tokio::test]
    async fn test_activity_round_trip_through_period_filter() {
        let store = memory_store().await;
        let record = |month: u8, line: &str| ActivityRecord {
            customer_id: "u1".to_string(),
            line: line.to_string(),
            year: 2025,
            month,
            deposit_cases: 3,
            deposit_amount: Decimal::new(12345, 2),
            withdraw_cases: 1,
            withdraw_amount: Decimal::new(500, 2),
            ggr: Decimal::new(11845, 2),
            active_days: 2,
        };
        store
            .insert_activity(&[
                record(1, "MYR"),
                record(3, "MYR"),
                record(3, "USC"),
                record(4, "MYR"),
            ])
            .await
            .unwrap();
        
        let q1 = ReportingPeriod::quarter(2025, 1).unwrap();
        let rows = store.fetch_rows(q1, None).await.unwrap();
        assert_eq!(rows.len(), 3);
        
        let myr = store.fetch_rows(q1, Some("MYR".to_string())).await.unwrap();
        assert_eq!(myr.len(), 2);
        let first = ActivityRecord::try_from(myr[0].clone()).unwrap();
        assert_eq!(first.deposit_amount, Decimal::new(12345, 2));
        assert_eq!(first.ggr, Decimal::new(11845, 2));
    }
}
