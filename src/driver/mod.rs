pub mod adapter;
pub mod aggregate;
pub mod batch;
pub mod runner;

pub use adapter::RawActivityRow;
pub use batch::{persist_in_batches, PersistOutcome, RetryConfig};
pub use runner::{CalibrationOutcome, CohortReport, PeriodAggregationDriver, RunSummary};
