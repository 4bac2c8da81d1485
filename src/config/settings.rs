use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, File};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::config::curves::{default_curves, MetricCurveConfig};
use crate::models::{
    CohortScope, Metric, PurchaseFrequencyMode, Result, TierEngineError, TIER_COUNT, TIER_GROUPS,
    TIER_NAMES,
};
use crate::scoring::weights::{self, MetricWeight, PotentialWeights};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub scoring: ScoringSettings,
    pub tiers: TierSettings,
    pub persistence: PersistenceSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    pub log_level: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    pub curves: Vec<MetricCurveConfig>,
    pub weights: Vec<MetricWeight>,
    pub potential: PotentialWeights,
    pub purchase_frequency: PurchaseFrequencyMode,
    pub cohort_scope: CohortScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSettings {
    pub names: Vec<String>,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "Tier Engine".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                log_level: "info".to_string(),
                environment: Environment::Development,
            },
            scoring: ScoringSettings {
                curves: default_curves(),
                weights: weights::default_weights(),
                potential: PotentialWeights::default(),
                purchase_frequency: PurchaseFrequencyMode::PerActiveDay,
                cohort_scope: CohortScope::Period,
            },
            tiers: TierSettings {
                names: TIER_NAMES.iter().map(|s| s.to_string()).collect(),
                groups: TIER_GROUPS.iter().map(|s| s.to_string()).collect(),
            },
            persistence: PersistenceSettings {
                batch_size: 50,
                batch_pause_ms: 100,
                max_attempts: 3,
                retry_base_delay_ms: 200,
                retry_max_delay_ms: 5_000,
            },
            database: DatabaseSettings {
                url: "sqlite://tier_engine.db".to_string(),
                max_connections: 5,
                connect_timeout_seconds: 30,
            },
        }
    }
}

impl Settings {
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("TIER_ENGINE").separator("__"))
            .build()?;
        
        s.try_deserialize()
    }
    
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?;
        
        s.try_deserialize()
    }
    
    /// Settings for the binary. An explicitly named file must load; its errors
    /// are returned. Without one, the layered sources are tried and the
    /// built-in defaults used if they fail.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::from_file(path)?),
            None => Ok(Self::new().unwrap_or_else(|e| {
                warn!(error = %e, "Could not load layered settings, using defaults");
                Self::default()
            })),
        }
    }
    
    pub fn total_weight(&self) -> f64 {
        weights::enabled_total(&self.scoring.weights)
    }
    
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TierEngineError::ConfigError(msg));
        
        if self.tiers.names.len() != TIER_COUNT || self.tiers.groups.len() != TIER_COUNT {
            return invalid(format!(
                "Tier names and groups must each have {} entries, got {} and {}",
                TIER_COUNT,
                self.tiers.names.len(),
                self.tiers.groups.len()
            ));
        }
        
        if self.persistence.batch_size == 0 {
            return invalid("Persistence batch size must be at least 1".to_string());
        }
        
        if self.persistence.max_attempts == 0 {
            return invalid("Persistence max attempts must be at least 1".to_string());
        }
        
        let curves = &self.scoring.curves;
        for (i, curve) in curves.iter().enumerate() {
            if curves[..i].iter().any(|c| c.metric == curve.metric) {
                return invalid(format!("Curve for {} configured more than once", curve.metric));
            }
        }
        
        weights::validate(&self.scoring.weights, &self.scoring.potential)
            .or_else(invalid)?;
        
        Ok(())
    }
    
    pub fn curve(&self, metric: Metric) -> Option<&MetricCurveConfig> {
        self.scoring.curves.iter().find(|c| c.metric == metric)
    }
}

impl PersistenceSettings {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}
