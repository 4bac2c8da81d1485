use std::collections::BTreeMap;

use crate::models::{ActivityRecord, CustomerPeriodAggregate, ReportingPeriod};

/// Sum records into one aggregate per (line, customer), ordered by that key.
///
/// Records outside `period` are ignored. For quarter and year periods this
/// rolls several monthly rows into one aggregate; ratios are derived later
/// from the sums.
pub fn aggregate_period<I>(records: I, period: &ReportingPeriod) -> Vec<CustomerPeriodAggregate>
where
    I: IntoIterator<Item = ActivityRecord>,
{
    let mut groups: BTreeMap<(String, String), CustomerPeriodAggregate> = BTreeMap::new();
    
    for record in records {
        if !period.contains(record.year, record.month) {
            continue;
        }
        
        groups
            .entry((record.line.clone(), record.customer_id.clone()))
            .or_insert_with(|| {
                CustomerPeriodAggregate::new(
                    record.customer_id.clone(),
                    record.line.clone(),
                    *period,
                )
            })
            .merge(&record);
    }
    
    groups.into_values().collect()
}
