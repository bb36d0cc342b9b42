// CSV rows as ordered column -> value maps, plus the row content hash

use crate::error::{ImportError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// One line of a CSV export, keyed by header name
///
/// Columns keep the header order so that hashing and display are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    columns: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(columns: Vec<(String, String)>) -> Self {
        RawRow { columns }
    }

    /// Zip a header record with a data record
    ///
    /// Short records only get the columns they have, so a missing value shows
    /// up as a missing key rather than an empty string.
    pub fn from_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        let columns = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawRow { columns }
    }

    /// Value of a column, failing with `MissingColumn` when absent
    ///
    /// With repeated header names the last column wins.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.columns
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| ImportError::MissingColumn(key.to_string()))
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for RawRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': '{}'", k, v)?;
        }
        f.write_str("}")
    }
}

/// Stable content hash of a row, hex-encoded SHA-256
///
/// The row is serialized as a JSON array of `[column, value]` pairs, so
/// quoting keeps keys and values from bleeding into each other and column
/// order matters.
pub fn hash_csv_row(row: &RawRow) -> String {
    let serialized = serde_json::to_string(&row.columns)
        .unwrap_or_else(|_| row.to_string());
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    format!("{:x}", hasher.finalize())
}
