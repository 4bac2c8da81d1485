use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{ActivityRecord, TierEngineError};

/// A source row as it comes out of storage, before normalisation.
///
/// Source tables name the same columns differently; the aliases below cover
/// the known shapes. Every field is optional and accepts either a number or
/// a numeric string. A value of the wrong shape reads as missing, so one bad
/// row never fails a whole result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawActivityRow {
    #[serde(
        default,
        alias = "userkey",
        alias = "user_key",
        alias = "customer_id",
        deserialize_with = "lenient::text"
    )]
    pub customer: Option<String>,
    #[serde(default, alias = "currency", alias = "brand", deserialize_with = "lenient::text")]
    pub line: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub month: Option<u8>,
    #[serde(default, alias = "dc", deserialize_with = "lenient::number")]
    pub deposit_cases: Option<f64>,
    #[serde(default, alias = "da", deserialize_with = "lenient::decimal")]
    pub deposit_amount: Option<Decimal>,
    #[serde(default, alias = "wc", deserialize_with = "lenient::number")]
    pub withdraw_cases: Option<f64>,
    #[serde(default, alias = "wa", deserialize_with = "lenient::decimal")]
    pub withdraw_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub ggr: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub net_profit: Option<Decimal>,
    #[serde(default, alias = "days_active", deserialize_with = "lenient::integer")]
    pub active_days: Option<u32>,
}

impl RawActivityRow {
    /// Parse a JSON array of rows.
    ///
    /// An element that is not an object becomes an empty row, which the driver
    /// then rejects and counts as skipped. Only text that is not a JSON array
    /// at all is an error.
    pub fn from_json_array(text: &str) -> crate::Result<Vec<RawActivityRow>> {
        let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
        
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value).unwrap_or_else(|e| {
                    warn!(row = index, error = %e, "Row is not an object, keeping it as empty");
                    RawActivityRow::default()
                })
            })
            .collect())
    }
}

/// Field deserializers that never fail: unusable values become `None`.
mod lenient {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;
    use tracing::warn;
    
    fn unusable<T>(value: &Value, expected: &str) -> Option<T> {
        if !value.is_null() {
            warn!(%value, expected, "Ignoring unusable column value");
        }
        None
    }
    
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            other => unusable(&other, "text"),
        })
    }
    
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(parsed.or_else(|| unusable(&value, "number")))
    }
    
    pub fn integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64>,
    {
        let value = Value::deserialize(deserializer)?;
        let whole = |f: f64| (f.is_finite() && f.fract() == 0.0).then_some(f as i64);
        let parsed = match &value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole))
            }
            _ => None,
        };
        Ok(parsed
            .and_then(|i| T::try_from(i).ok())
            .or_else(|| unusable(&value, "integer")))
    }
    
    pub fn decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let parse = |s: &str| Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok();
        let parsed = match &value {
            Value::Number(n) => parse(&n.to_string()),
            Value::String(s) => parse(s.trim()),
            _ => None,
        };
        Ok(parsed.or_else(|| unusable(&value, "decimal")))
    }
}

fn required_text(value: Option<String>, what: &str) -> Result<String, TierEngineError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TierEngineError::MalformedRow(format!("missing {}", what)))
}

/// Case counts arrive as numbers of any shape; anything unusable counts as zero.
fn case_count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

impl TryFrom<RawActivityRow> for ActivityRecord {
    type Error = TierEngineError;
    
    fn try_from(row: RawActivityRow) -> Result<Self, Self::Error> {
        let customer_id = required_text(row.customer, "customer identity")?;
        let line = required_text(row.line, "line")?.to_uppercase();
        let year = row.year.ok_or_else(|| {
            TierEngineError::MalformedRow(format!("missing year for {}", customer_id))
        })?;
        let month = match row.month {
            Some(m) if (1..=12).contains(&m) => m,
            other => {
                return Err(TierEngineError::MalformedRow(format!(
                    "invalid month {:?} for {}",
                    other, customer_id
                )))
            }
        };
        
        let deposit_amount = row.deposit_amount.unwrap_or(Decimal::ZERO);
        let withdraw_amount = row.withdraw_amount.unwrap_or(Decimal::ZERO);
        let ggr = row
            .ggr
            .or(row.net_profit)
            .unwrap_or(deposit_amount - withdraw_amount);
        
        Ok(ActivityRecord {
            customer_id,
            line,
            year,
            month,
            deposit_cases: case_count(row.deposit_cases),
            deposit_amount,
            withdraw_cases: case_count(row.withdraw_cases),
            withdraw_amount,
            ggr,
            active_days: row.active_days.unwrap_or(0),
        })
    }
}
