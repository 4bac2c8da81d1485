use async_trait::async_trait;

use crate::driver::adapter::RawActivityRow;
use crate::models::{ReportingPeriod, Result, TierAssignment};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistent home of tier assignments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TierStore: Send + Sync {
    /// Insert or overwrite each assignment under its (customer, line, period) key.
    /// Returns the number of rows written.
    async fn upsert_assignments(&self, batch: &[TierAssignment]) -> Result<usize>;
    
    /// Assignments for a period, optionally restricted to one line, ordered by line then customer.
    async fn load_assignments(
        &self,
        period: ReportingPeriod,
        line: Option<String>,
    ) -> Result<Vec<TierAssignment>>;
}

/// Supplier of raw monthly activity rows.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Rows for every month covered by `period`, optionally restricted to one line.
    async fn fetch_rows(
        &self,
        period: ReportingPeriod,
        line: Option<String>,
    ) -> Result<Vec<RawActivityRow>>;
}
