use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{
    config::{PersistenceSettings, Settings},
    driver::{
        adapter::RawActivityRow,
        aggregate::aggregate_period,
        batch::persist_in_batches,
    },
    models::{
        ActivityRecord, CohortScope, CompositeScore, CustomerPeriodAggregate, DerivedMetrics,
        PurchaseFrequencyMode, ReportingPeriod, Result, TierAssignment, TierBoundaries,
    },
    report::TierDistribution,
    scoring::{BoundaryCalibrator, ScoringAlgorithm, TierAssigner},
    store::{ActivitySource, TierStore},
};

/// Boundaries and resulting spread for one calibrated cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    /// `None` when every line in the period was calibrated together.
    pub line: Option<String>,
    pub customers: usize,
    pub boundaries: TierBoundaries,
    pub distribution: TierDistribution,
}

/// Result of scoring and tiering one period, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub period: ReportingPeriod,
    pub scope: CohortScope,
    pub assignments: Vec<TierAssignment>,
    pub cohorts: Vec<CohortReport>,
    pub skipped_rows: usize,
    pub out_of_period_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub period: ReportingPeriod,
    pub scope: CohortScope,
    pub total_processed: usize,
    pub total_updated: usize,
    pub failed_batches: usize,
    pub skipped_rows: usize,
    pub cohorts: Vec<CohortReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.failed_batches == 0 && self.total_updated == self.total_processed
    }
}

struct ScoredCustomer {
    aggregate: CustomerPeriodAggregate,
    metrics: DerivedMetrics,
    composite: CompositeScore,
}

/// Turns raw activity rows for a period into persisted tier assignments.
///
/// Holds only immutable configuration, so one driver can serve any number of
/// concurrent runs over different periods.
pub struct PeriodAggregationDriver {
    algorithm: ScoringAlgorithm,
    calibrator: BoundaryCalibrator,
    assigner: TierAssigner,
    pf_mode: PurchaseFrequencyMode,
    persistence: PersistenceSettings,
}

impl PeriodAggregationDriver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            algorithm: ScoringAlgorithm::new(&settings.scoring),
            calibrator: BoundaryCalibrator::new(),
            assigner: TierAssigner::new(&settings.tiers),
            pf_mode: settings.scoring.purchase_frequency,
            persistence: settings.persistence.clone(),
        }
    }
    
    pub fn algorithm(&self) -> &ScoringAlgorithm {
        &self.algorithm
    }
    
    pub fn assigner(&self) -> &TierAssigner {
        &self.assigner
    }
    
    /// Score, calibrate and tier every customer in `rows` for `period`. Pure: no I/O.
    pub fn calculate(
        &self,
        rows: Vec<RawActivityRow>,
        period: ReportingPeriod,
        scope: CohortScope,
    ) -> CalibrationOutcome {
        let mut skipped_rows = 0;
        let mut out_of_period_rows = 0;
        let mut records = Vec::with_capacity(rows.len());
        
        for (index, row) in rows.into_iter().enumerate() {
            match ActivityRecord::try_from(row) {
                Ok(record) if period.contains(record.year, record.month) => records.push(record),
                Ok(_) => out_of_period_rows += 1,
                Err(e) => {
                    warn!(row = index, %period, error = %e, "Skipping malformed row");
                    skipped_rows += 1;
                }
            }
        }
        
        let scored: Vec<ScoredCustomer> = aggregate_period(records, &period)
            .into_iter()
            .map(|aggregate| {
                let metrics = aggregate.derive(self.pf_mode);
                let composite = self.algorithm.calculate_score(&metrics);
                ScoredCustomer { aggregate, metrics, composite }
            })
            .collect();
        
        let mut cohorts: BTreeMap<Option<String>, Vec<&ScoredCustomer>> = BTreeMap::new();
        for customer in &scored {
            let key = match scope {
                CohortScope::Period => None,
                CohortScope::PeriodAndLine => Some(customer.aggregate.line.clone()),
            };
            cohorts.entry(key).or_default().push(customer);
        }
        
        let mut assignments = Vec::with_capacity(scored.len());
        let mut reports = Vec::with_capacity(cohorts.len());
        
        for (line, members) in cohorts {
            let scores: Vec<f64> = members.iter().map(|c| c.composite.total_score).collect();
            let boundaries = self.calibrator.calibrate(&scores);
            
            let cohort: Vec<TierAssignment> = members
                .into_iter()
                .map(|c| self.to_assignment(c, &boundaries))
                .collect();
            
            debug!(
                %period,
                line = ?line,
                customers = cohort.len(),
                cuts = ?boundaries.cuts,
                "Cohort tiered"
            );
            reports.push(CohortReport {
                line,
                customers: cohort.len(),
                boundaries,
                distribution: TierDistribution::build(&cohort, &self.assigner),
            });
            assignments.extend(cohort);
        }
        
        assignments.sort_by(|a, b| (&a.line, &a.customer_id).cmp(&(&b.line, &b.customer_id)));
        
        CalibrationOutcome {
            period,
            scope,
            assignments,
            cohorts: reports,
            skipped_rows,
            out_of_period_rows,
        }
    }
    
    fn to_assignment(
        &self,
        customer: &ScoredCustomer,
        boundaries: &TierBoundaries,
    ) -> TierAssignment {
        let score = customer.composite.total_score;
        let tier = self.assigner.assign(score, boundaries);
        
        TierAssignment {
            customer_id: customer.aggregate.customer_id.clone(),
            line: customer.aggregate.line.clone(),
            period: customer.aggregate.period,
            tier,
            tier_name: self.assigner.name(tier).to_string(),
            tier_group: self.assigner.group(tier).to_string(),
            score,
            potential_score: customer.composite.potential_score,
            metrics: customer.metrics,
            breakdown: customer.composite.breakdown.clone(),
        }
    }
    
    /// Calculate tiers for `rows` and persist them in batches.
    pub async fn run_for_period(
        &self,
        rows: Vec<RawActivityRow>,
        period: ReportingPeriod,
        scope: CohortScope,
        store: &dyn TierStore,
    ) -> RunSummary {
        let started_at = Utc::now();
        let outcome = self.calculate(rows, period, scope);
        let persisted = persist_in_batches(store, &outcome.assignments, &self.persistence).await;
        
        let summary = RunSummary {
            period,
            scope,
            total_processed: outcome.assignments.len(),
            total_updated: persisted.total_updated,
            failed_batches: persisted.failed_batches,
            skipped_rows: outcome.skipped_rows,
            cohorts: outcome.cohorts,
            started_at,
            finished_at: Utc::now(),
        };
        
        info!(
            %period,
            processed = summary.total_processed,
            updated = summary.total_updated,
            failed_batches = summary.failed_batches,
            skipped_rows = summary.skipped_rows,
            "Tier calculation finished"
        );
        
        summary
    }
    
    /// Fetch rows for `period` from `source`, then calculate and persist.
    ///
    /// Only a failure to read the source is returned as an error.
    pub async fn run_from_source(
        &self,
        source: &dyn ActivitySource,
        store: &dyn TierStore,
        period: ReportingPeriod,
        scope: CohortScope,
        line: Option<String>,
    ) -> Result<RunSummary> {
        let rows = source.fetch_rows(period, line).await?;
        info!(%period, rows = rows.len(), "Fetched activity rows");
        Ok(self.run_for_period(rows, period, scope, store).await)
    }
    
    /// Run several independent periods concurrently. Results follow the order of `periods`.
    pub async fn run_many(
        &self,
        source: &dyn ActivitySource,
        store: &dyn TierStore,
        periods: &[ReportingPeriod],
        scope: CohortScope,
        line: Option<String>,
    ) -> Vec<Result<RunSummary>> {
        join_all(
            periods
                .iter()
                .map(|&period| self.run_from_source(source, store, period, scope, line.clone())),
        )
        .await
    }
}
