// CSV import framework
//
// An importer turns one RawRow into at most one record and hands it to an
// EventSink. The driver below owns the file handling and the per-row error
// boundary: recoverable errors become warnings, everything else aborts.

pub mod blockfi_trades;
pub mod blockfi_transactions;

use crate::db::EventSink;
use crate::error::{ImportError, Result};
use crate::messages::MessageAggregator;
use crate::row::RawRow;
use crate::types::Location;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub use blockfi_trades::BlockFiTradesImporter;
pub use blockfi_transactions::{BlockFiTransactionsImporter, TransactionKind, BLOCKFI_PREFIX};

// ============================================================================
// ROW OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    AssetMovement,
    HistoryEvent,
    Trade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Row has no confirmation time yet
    Unconfirmed,
    /// Trade row in the transactions file; trades come from the trades file
    Trade,
    /// Trade row that sold nothing
    ZeroAmount,
}

/// What happened to a row that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// One record was produced. `stored` is 0 when the sink already had it.
    Emitted { kind: RecordKind, stored: usize },
    Skipped(SkipReason),
}

/// Counters for one imported file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub rows: usize,
    pub movements: usize,
    pub events: usize,
    pub trades: usize,
    pub duplicates: usize,
    pub unconfirmed: usize,
    pub ignored: usize,
    pub warnings: usize,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Emitted { kind, stored } => {
                match kind {
                    RecordKind::AssetMovement => self.movements += 1,
                    RecordKind::HistoryEvent => self.events += 1,
                    RecordKind::Trade => self.trades += 1,
                }
                if stored == 0 {
                    self.duplicates += 1;
                }
            }
            RowOutcome::Skipped(SkipReason::Unconfirmed) => self.unconfirmed += 1,
            RowOutcome::Skipped(SkipReason::Trade | SkipReason::ZeroAmount) => self.ignored += 1,
        }
    }

    /// Records produced, duplicates included
    pub fn emitted(&self) -> usize {
        self.movements + self.events + self.trades
    }
}

// ============================================================================
// IMPORTER TRAIT
// ============================================================================

/// One exchange export format
pub trait CsvImporter {
    /// Exchange the file comes from
    fn location(&self) -> Location;

    /// Classify one row and push its record, if any, into the sink
    ///
    /// May fail with a recoverable error (the row is skipped with a warning)
    /// or with `MissingColumn`, which aborts the file.
    fn consume_row(&self, sink: &mut dyn EventSink, row: &RawRow) -> Result<RowOutcome>;

    /// Warning text for a recoverable row failure
    fn warning_for(&self, err: &ImportError) -> String {
        let name = self.location().name();
        match err {
            ImportError::UnknownAsset(symbol) => format!(
                "During {} CSV import found action with unknown asset {}. Ignoring entry",
                name, symbol
            ),
            ImportError::Deserialization(msg) => format!(
                "Deserialization error during {} CSV import. {}. Ignoring entry",
                name, msg
            ),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// Import CSV data from any reader
///
/// Rows may be shorter than the header; a missing value then surfaces as a
/// missing column.
pub fn import_reader<R: Read>(
    importer: &dyn CsvImporter,
    sink: &mut dyn EventSink,
    reader: R,
    msgs: &mut MessageAggregator,
) -> Result<ImportSummary> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut summary = ImportSummary::default();

    for result in rdr.records() {
        let record = result?;
        let row = RawRow::from_record(&headers, &record);
        summary.rows += 1;

        match importer.consume_row(sink, &row) {
            Ok(outcome) => summary.record(outcome),
            Err(err) if err.is_recoverable() => {
                msgs.add_warning(importer.warning_for(&err));
                summary.warnings += 1;
            }
            Err(ImportError::MissingColumn(key)) => {
                return Err(ImportError::Input(format!(
                    "Could not find key {} in csv row {}",
                    key, row
                )));
            }
            Err(err) => return Err(err),
        }
    }

    debug!(?summary, "finished reading rows");
    Ok(summary)
}

/// Import a CSV file
///
/// The file must be UTF-8; a leading byte-order mark is dropped.
pub fn import_csv(
    importer: &dyn CsvImporter,
    sink: &mut dyn EventSink,
    path: &Path,
    msgs: &mut MessageAggregator,
) -> Result<ImportSummary> {
    let content = std::fs::read_to_string(path)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(content.as_str());

    let summary = import_reader(importer, sink, content.as_bytes(), msgs)?;
    info!(
        file = %path.display(),
        location = %importer.location(),
        rows = summary.rows,
        emitted = summary.emitted(),
        warnings = summary.warnings,
        "imported CSV file"
    );
    Ok(summary)
}
