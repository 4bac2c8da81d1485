pub mod curves;
pub mod settings;

pub use curves::{CurvePoint, MetricCurveConfig, ZeroFallback, EXCEL_METRIC_CONFIGS};
pub use settings::{DatabaseSettings, PersistenceSettings, ScoringSettings, Settings, TierSettings};
