use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use std::fmt;
use tracing::warn;

use super::ReportingPeriod;

/// The five scored customer metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "DA")]
    DepositAmount,
    #[serde(rename = "GGR")]
    Ggr,
    #[serde(rename = "PF")]
    PurchaseFrequency,
    #[serde(rename = "ATV")]
    AvgTransactionValue,
    #[serde(rename = "WIN_RATE")]
    WinRate,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::DepositAmount,
        Metric::Ggr,
        Metric::PurchaseFrequency,
        Metric::AvgTransactionValue,
        Metric::WinRate,
    ];
    
    pub fn code(&self) -> &'static str {
        match self {
            Metric::DepositAmount => "DA",
            Metric::Ggr => "GGR",
            Metric::PurchaseFrequency => "PF",
            Metric::AvgTransactionValue => "ATV",
            Metric::WinRate => "WIN_RATE",
        }
    }
    
    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "DA" | "DEPOSIT_AMOUNT" => Some(Metric::DepositAmount),
            "GGR" => Some(Metric::Ggr),
            "PF" | "PURCHASE_FREQUENCY" => Some(Metric::PurchaseFrequency),
            "ATV" | "AVG_TRANSACTION_VALUE" => Some(Metric::AvgTransactionValue),
            "WIN_RATE" | "WINRATE" | "WR" => Some(Metric::WinRate),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How purchase frequency is normalised for a single customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseFrequencyMode {
    /// deposit_cases / active_days, 0 when the customer has no active days.
    #[default]
    PerActiveDay,
    /// deposit_cases as-is: the customer is its own active member.
    PerCustomer,
}

/// One normalised source row: a customer's activity on a line for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub customer_id: String,
    pub line: String,
    pub year: i32,
    pub month: u8,
    pub deposit_cases: u64,
    pub deposit_amount: Decimal,
    pub withdraw_cases: u64,
    pub withdraw_amount: Decimal,
    pub ggr: Decimal,
    pub active_days: u32,
}

/// Summed raw metrics for one (customer, line) within a reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPeriodAggregate {
    pub customer_id: String,
    pub line: String,
    pub period: ReportingPeriod,
    pub deposit_cases: u64,
    pub deposit_amount: Decimal,
    pub withdraw_cases: u64,
    pub withdraw_amount: Decimal,
    pub ggr: Decimal,
    pub active_days: u32,
    pub source_rows: u32,
}

/// Metrics fed to the curve scorer. Ratios are recomputed from summed raw values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DerivedMetrics {
    pub deposit_amount: f64,
    pub ggr: f64,
    pub purchase_frequency: f64,
    pub avg_transaction_value: f64,
    pub win_rate: f64,
}

fn add_amount(total: &mut Decimal, amount: Decimal, column: &str, customer: &str) {
    *total = total.checked_add(amount).unwrap_or_else(|| {
        warn!(column, customer, %amount, "Amount sum overflowed, clamping");
        if amount.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    });
}

impl CustomerPeriodAggregate {
    pub fn new(customer_id: String, line: String, period: ReportingPeriod) -> Self {
        Self {
            customer_id,
            line,
            period,
            deposit_cases: 0,
            deposit_amount: Decimal::ZERO,
            withdraw_cases: 0,
            withdraw_amount: Decimal::ZERO,
            ggr: Decimal::ZERO,
            active_days: 0,
            source_rows: 0,
        }
    }
    
    /// Add one record's raw values. Sums saturate instead of overflowing.
    pub fn merge(&mut self, record: &ActivityRecord) {
        self.deposit_cases = self.deposit_cases.saturating_add(record.deposit_cases);
        self.withdraw_cases = self.withdraw_cases.saturating_add(record.withdraw_cases);
        self.active_days = self.active_days.saturating_add(record.active_days);
        self.source_rows = self.source_rows.saturating_add(1);
        
        let customer = self.customer_id.as_str();
        add_amount(&mut self.deposit_amount, record.deposit_amount, "deposit_amount", customer);
        add_amount(&mut self.withdraw_amount, record.withdraw_amount, "withdraw_amount", customer);
        add_amount(&mut self.ggr, record.ggr, "ggr", customer);
    }
    
    pub fn derive(&self, mode: PurchaseFrequencyMode) -> DerivedMetrics {
        let deposit_amount: f64 = self.deposit_amount.try_into().unwrap_or(0.0);
        let ggr: f64 = self.ggr.try_into().unwrap_or(0.0);
        let cases = self.deposit_cases as f64;
        
        let avg_transaction_value = if self.deposit_cases == 0 {
            0.0
        } else {
            deposit_amount / cases
        };
        
        let purchase_frequency = match mode {
            PurchaseFrequencyMode::PerActiveDay if self.active_days == 0 => 0.0,
            PurchaseFrequencyMode::PerActiveDay => cases / self.active_days as f64,
            PurchaseFrequencyMode::PerCustomer => cases,
        };
        
        let win_rate = if deposit_amount <= 0.0 {
            0.0
        } else {
            ggr / deposit_amount * 100.0
        };
        
        DerivedMetrics {
            deposit_amount,
            ggr,
            purchase_frequency,
            avg_transaction_value,
            win_rate,
        }
    }
}

impl DerivedMetrics {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::DepositAmount => self.deposit_amount,
            Metric::Ggr => self.ggr,
            Metric::PurchaseFrequency => self.purchase_frequency,
            Metric::AvgTransactionValue => self.avg_transaction_value,
            Metric::WinRate => self.win_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn record(month: u8, cases: u64, amount: i64, ggr: i64, days: u32) -> ActivityRecord {
        ActivityRecord {
            customer_id: "u1".to_string(),
            line: "MYR".to_string(),
            year: 2025,
            month,
            deposit_cases: cases,
            deposit_amount: Decimal::from(amount),
            withdraw_cases: 0,
            withdraw_amount: Decimal::ZERO,
            ggr: Decimal::from(ggr),
            active_days: days,
        }
    }
    
    #[test]
    fn test_zero_deposit_cases_is_safe() {
        let period = ReportingPeriod::month(2025, 1).unwrap();
        let agg = CustomerPeriodAggregate::new("u1".to_string(), "MYR".to_string(), period);
        let derived = agg.derive(PurchaseFrequencyMode::PerActiveDay);
        
        assert_eq!(derived.avg_transaction_value, 0.0);
        assert_eq!(derived.purchase_frequency, 0.0);
        assert_eq!(derived.win_rate, 0.0);
        assert!(derived.win_rate.is_finite());
    }
    
    #[test]
    fn test_ratios_recomputed_from_sums() {
        let period = ReportingPeriod::quarter(2025, 1).unwrap();
        let mut agg = CustomerPeriodAggregate::new("u1".to_string(), "MYR".to_string(), period);
        // Month ATVs are 100 and 10; the quarter ATV is 1100 / 11, not their mean.
        agg.merge(&record(1, 1, 100, 10, 1));
        agg.merge(&record(2, 10, 1000, 100, 9));
        
        let derived = agg.derive(PurchaseFrequencyMode::PerActiveDay);
        assert_eq!(agg.source_rows, 2);
        assert!((derived.avg_transaction_value - 100.0).abs() < 1e-9);
        assert!((derived.purchase_frequency - 1.1).abs() < 1e-9);
        assert!((derived.win_rate - 10.0).abs() < 1e-9);
    }
    
    #[test]
    fn test_absurd_rows_saturate_instead_of_panicking() {
        let period = ReportingPeriod::month(2025, 1).unwrap();
        let mut agg = CustomerPeriodAggregate::new("u1".to_string(), "MYR".to_string(), period);
        let huge = ActivityRecord {
            deposit_cases: u64::MAX,
            deposit_amount: Decimal::MAX,
            ggr: Decimal::MIN,
            active_days: u32::MAX,
            ..record(1, 0, 0, 0, 0)
        };
        agg.merge(&huge);
        agg.merge(&huge);
        
        assert_eq!(agg.deposit_cases, u64::MAX);
        assert_eq!(agg.active_days, u32::MAX);
        assert_eq!(agg.deposit_amount, Decimal::MAX);
        assert_eq!(agg.ggr, Decimal::MIN);
        assert_eq!(agg.source_rows, 2);
        assert!(agg.derive(PurchaseFrequencyMode::PerActiveDay).avg_transaction_value.is_finite());
    }
    
    #[test]
    fn test_purchase_frequency_modes() {
        let period = ReportingPeriod::month(2025, 1).unwrap();
        let mut agg = CustomerPeriodAggregate::new("u1".to_string(), "SGD".to_string(), period);
        agg.merge(&record(1, 12, 600, 0, 4));
        
        assert_eq!(agg.derive(PurchaseFrequencyMode::PerActiveDay).purchase_frequency, 3.0);
        assert_eq!(agg.derive(PurchaseFrequencyMode::PerCustomer).purchase_frequency, 12.0);
    }
    
    #[test]
    fn test_negative_deposit_amount_gives_zero_win_rate() {
        let period = ReportingPeriod::month(2025, 1).unwrap();
        let mut agg = CustomerPeriodAggregate::new("u1".to_string(), "USC".to_string(), period);
        agg.merge(&record(1, 1, -50, 20, 1));
        assert_eq!(agg.derive(PurchaseFrequencyMode::PerActiveDay).win_rate, 0.0);
    }
    
    #[test]
    fn test_metric_codes() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_code(metric.code()), Some(metric));
        }
        assert_eq!(Metric::from_code("win-rate"), Some(Metric::WinRate));
        assert_eq!(Metric::from_code("nope"), None);
        assert_eq!(serde_json::to_string(&Metric::WinRate).unwrap(), "\"WIN_RATE\"");
    }
}
