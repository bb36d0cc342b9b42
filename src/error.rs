//! Error types for the BlockFi importers.
//!
//! Errors fall in two tiers. Row-level errors (unknown asset, bad value,
//! unsupported entry) are recoverable: the driver turns them into warnings
//! and moves on. Everything else aborts the whole file.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug)]
pub enum ImportError {
    /// The asset symbol could not be mapped to a known asset.
    #[error("Unknown asset {0}")]
    UnknownAsset(String),

    /// A timestamp or amount could not be parsed.
    #[error("{0}")]
    Deserialization(String),

    /// The row carries a transaction type the importer does not handle.
    #[error("{0}")]
    UnsupportedEntry(String),

    /// A column the importer needs is missing from the row.
    #[error("missing column {0}")]
    MissingColumn(String),

    /// The input file is structurally wrong. Aborts the import.
    #[error("{0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl ImportError {
    /// Whether a row failing with this error can be skipped with a warning.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ImportError::UnknownAsset(_)
                | ImportError::Deserialization(_)
                | ImportError::UnsupportedEntry(_)
        )
    }
}
