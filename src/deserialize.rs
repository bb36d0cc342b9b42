// Value parsing shared by the importers
// Every failure here is a row-level Deserialization error

use crate::error::{ImportError, Result};
use crate::types::Timestamp;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a date string with a strftime format into a UTC unix timestamp
pub fn deserialize_timestamp_from_date(
    date: &str,
    format: &str,
    location: &str,
) -> Result<Timestamp> {
    let date = date.trim();
    NaiveDateTime::parse_from_str(date, format)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|e| {
            ImportError::Deserialization(format!(
                "Failed to deserialize {} timestamp entry {} with format {}: {}",
                location, date, format, e
            ))
        })
}

/// Parse a signed decimal amount
///
/// Accepts plain and scientific notation (`1e-8`), which shows up for small
/// interest payments.
pub fn deserialize_asset_amount(amount: &str) -> Result<Decimal> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(ImportError::Deserialization(
            "Failed to deserialize an amount entry from an empty string".to_string(),
        ));
    }

    Decimal::from_str(amount)
        .or_else(|_| Decimal::from_scientific(amount))
        .map_err(|_| {
            ImportError::Deserialization(format!(
                "Failed to deserialize an amount entry from {}",
                amount
            ))
        })
}
