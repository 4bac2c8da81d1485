pub mod models;
pub mod config;
pub mod scoring;
pub mod driver;
pub mod store;
pub mod report;

pub use models::{
    CohortScope, CustomerPeriodAggregate, Metric, ReportingPeriod, Tier, TierAssignment,
    TierBoundaries, TierEngineError, Result,
};
pub use config::Settings;
pub use driver::{PeriodAggregationDriver, RawActivityRow, RunSummary};
pub use scoring::{BoundaryCalibrator, MetricScorer, ScoringAlgorithm, TierAssigner};

// Re-export commonly used types
pub use rust_decimal::Decimal;
