use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use super::{Result, TierEngineError};

/// Width of a reporting period. Months and quarters are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum Granularity {
    Month(u8),
    Quarter(u8),
    Year,
}

/// Which customers are calibrated together within one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CohortScope {
    /// Every line in the period shares one set of boundaries.
    #[default]
    Period,
    /// Each business line gets its own boundaries.
    PeriodAndLine,
}

/// The period a cohort is calibrated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub year: i32,
    pub granularity: Granularity,
}

impl ReportingPeriod {
    pub fn month(year: i32, month: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(TierEngineError::InvalidPeriod(format!("month {} out of range", month)));
        }
        Ok(Self { year, granularity: Granularity::Month(month) })
    }
    
    pub fn quarter(year: i32, quarter: u8) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(TierEngineError::InvalidPeriod(format!("quarter {} out of range", quarter)));
        }
        Ok(Self { year, granularity: Granularity::Quarter(quarter) })
    }
    
    pub fn year(year: i32) -> Self {
        Self { year, granularity: Granularity::Year }
    }
    
    /// Rebuild a period from its storage columns.
    pub fn from_parts(year: i32, kind: &str, index: u8) -> Result<Self> {
        match kind {
            "month" => Self::month(year, index),
            "quarter" => Self::quarter(year, index),
            "year" => Ok(Self::year(year)),
            other => Err(TierEngineError::InvalidPeriod(format!(
                "unknown period kind '{}'",
                other
            ))),
        }
    }
    
    pub fn kind(&self) -> &'static str {
        match self.granularity {
            Granularity::Month(_) => "month",
            Granularity::Quarter(_) => "quarter",
            Granularity::Year => "year",
        }
    }
    
    /// Month or quarter number; 0 for a whole year.
    pub fn index(&self) -> u8 {
        match self.granularity {
            Granularity::Month(m) => m,
            Granularity::Quarter(q) => q,
            Granularity::Year => 0,
        }
    }
    
    pub fn months(&self) -> RangeInclusive<u8> {
        match self.granularity {
            Granularity::Month(m) => m..=m,
            Granularity::Quarter(q) => {
                let first = (q - 1) * 3 + 1;
                first..=first + 2
            }
            Granularity::Year => 1..=12,
        }
    }
    
    pub fn contains(&self, year: i32, month: u8) -> bool {
        self.year == year && self.months().contains(&month)
    }
    
    /// True when rows from several source months are rolled up into one aggregate.
    pub fn is_rollup(&self) -> bool {
        !matches!(self.granularity, Granularity::Month(_))
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.granularity {
            Granularity::Month(m) => write!(f, "{}-{:02}", self.year, m),
            Granularity::Quarter(q) => write!(f, "{}-Q{}", self.year, q),
            Granularity::Year => write!(f, "{}", self.year),
        }
    }
}

impl FromStr for ReportingPeriod {
    type Err = TierEngineError;
    
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TierEngineError::InvalidPeriod(s.to_string());
        let s = s.trim();
        
        match s.split_once('-') {
            None => {
                let year = s.parse::<i32>().map_err(|_| invalid())?;
                Ok(Self::year(year))
            }
            Some((year, rest)) => {
                let year = year.parse::<i32>().map_err(|_| invalid())?;
                if let Some(q) = rest.strip_prefix('Q').or_else(|| rest.strip_prefix('q')) {
                    let q = q.parse::<u8>().map_err(|_| invalid())?;
                    Self::quarter(year, q)
                } else {
                    let m = rest.parse::<u8>().map_err(|_| invalid())?;
                    Self::month(year, m)
                }
            }
        }
    }
}
