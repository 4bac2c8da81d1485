use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::PersistenceSettings;
use crate::models::TierAssignment;
use crate::store::TierStore;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl From<&PersistenceSettings> for RetryConfig {
    fn from(settings: &PersistenceSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            max_delay: Duration::from_millis(settings.retry_max_delay_ms),
            ..Default::default()
        }
    }
}

/// Retry with exponential backoff
pub async fn retry_with_backoff<F, T, Fut, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!("Operation {} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if attempt >= config.max_attempts => {
                error!("Operation {} failed after {} attempts: {}", operation_name, attempt, e);
                return Err(e);
            }
            Err(e) => {
                warn!("Operation {} failed on attempt {}: {}", operation_name, attempt, e);
                sleep(calculate_delay(config, attempt)).await;
                attempt += 1;
            }
        }
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let delay_ms = config.base_delay.as_millis() as f64 
        * config.backoff_multiplier.powi((attempt - 1) as i32);
    
    let delay = Duration::from_millis(delay_ms as u64);
    
    if delay > config.max_delay {
        config.max_delay
    } else {
        delay
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub total_updated: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Upsert `assignments` in chunks of `batch_size`, pausing between chunks.
///
/// A chunk that still fails after its retries is logged and skipped; earlier
/// chunks stay written and later chunks are still attempted.
pub async fn persist_in_batches(
    store: &dyn TierStore,
    assignments: &[TierAssignment],
    settings: &PersistenceSettings,
) -> PersistOutcome {
    let retry = RetryConfig::from(settings);
    let batch_size = settings.batch_size.max(1);
    let mut outcome = PersistOutcome::default();
    
    for (index, batch) in assignments.chunks(batch_size).enumerate() {
        if index > 0 && settings.batch_pause_ms > 0 {
            sleep(settings.batch_pause()).await;
        }
        outcome.batches += 1;
        
        let name = format!("upsert batch {}", index);
        match retry_with_backoff(&retry, &name, || store.upsert_assignments(batch)).await {
            Ok(written) => {
                debug!(batch = index, written, "Batch persisted");
                outcome.total_updated += written;
            }
            Err(e) => {
                let keys: Vec<String> = batch
                    .iter()
                    .map(|a| format!("{}/{}", a.line, a.customer_id))
                    .collect();
                error!(
                    batch = index,
                    size = batch.len(),
                    ?keys,
                    error = %e,
                    "Batch upsert failed, skipping"
                );
                outcome.failed_batches += 1;
            }
        }
    }
    
    outcome
}
