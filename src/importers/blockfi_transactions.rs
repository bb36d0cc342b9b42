// BlockFi transaction history importer
//
// Column reference:
// https://github.com/BittyTax/BittyTax/blob/06794f51223398759852d6853bc7112ffb96129a/bittytax/conv/parsers/blockfi.py#L67

use super::{CsvImporter, RecordKind, RowOutcome, SkipReason};
use crate::assets::{AssetResolver, BlockFiAssetResolver};
use crate::config::ImportConfig;
use crate::db::EventSink;
use crate::deserialize::{deserialize_asset_amount, deserialize_timestamp_from_date};
use crate::error::{ImportError, Result};
use crate::row::{hash_csv_row, RawRow};
use crate::types::{
    ts_sec_to_ms, Asset, AssetMovement, HistoryEvent, HistoryEventSubType, HistoryEventType,
    Location, MovementCategory, Timestamp,
};
use rust_decimal::Decimal;
use tracing::debug;

/// Prefix of event identifiers derived from BlockFi rows
pub const BLOCKFI_PREFIX: &str = "BLF_";

/// The `Transaction Type` values BlockFi writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    WithdrawalFee,
    /// Interest, bonus and referral payouts
    Income,
    /// Direction follows the sign of the amount
    CryptoTransfer,
    Trade,
}

impl TransactionKind {
    pub fn parse(entry_type: &str) -> Option<Self> {
        match entry_type {
            "Deposit" | "Wire Deposit" | "ACH Deposit" => Some(TransactionKind::Deposit),
            "Withdrawal" | "Wire Withdrawal" | "ACH Withdrawal" => {
                Some(TransactionKind::Withdrawal)
            }
            "Withdrawal Fee" => Some(TransactionKind::WithdrawalFee),
            "Interest Payment" | "Bonus Payment" | "Referral Bonus" => {
                Some(TransactionKind::Income)
            }
            "Crypto Transfer" => Some(TransactionKind::CryptoTransfer),
            "Trade" => Some(TransactionKind::Trade),
            _ => None,
        }
    }
}

/// Importer for the BlockFi "transactions" CSV export
///
/// Trades in this file are ignored. They are imported from the trades export
/// instead, see `BlockFiTradesImporter`.
pub struct BlockFiTransactionsImporter<R: AssetResolver = BlockFiAssetResolver> {
    resolver: R,
    timestamp_format: String,
    fee_asset: Asset,
}

impl BlockFiTransactionsImporter {
    pub fn new() -> Self {
        Self::from_config(&ImportConfig::default())
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        BlockFiTransactionsImporter {
            resolver: config.asset_resolver(),
            timestamp_format: config.timestamp_format.clone(),
            fee_asset: config.fee_asset(),
        }
    }
}

impl Default for BlockFiTransactionsImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AssetResolver> BlockFiTransactionsImporter<R> {
    pub fn with_resolver(resolver: R, timestamp_format: &str, fee_asset: Asset) -> Self {
        BlockFiTransactionsImporter {
            resolver,
            timestamp_format: timestamp_format.to_string(),
            fee_asset,
        }
    }

    fn movement(
        &self,
        category: MovementCategory,
        timestamp: Timestamp,
        asset: Asset,
        amount: Decimal,
    ) -> AssetMovement {
        AssetMovement {
            location: Location::BlockFi,
            category,
            address: None,
            transaction_id: None,
            timestamp,
            asset,
            amount,
            // BlockFi doesn't provide information about fees
            fee: Decimal::ZERO,
            fee_asset: self.fee_asset.clone(),
            link: String::new(),
        }
    }

    fn event(
        row: &RawRow,
        entry_type: &str,
        timestamp: Timestamp,
        asset: Asset,
        amount: Decimal,
        event_type: HistoryEventType,
        event_subtype: HistoryEventSubType,
    ) -> HistoryEvent {
        HistoryEvent {
            event_identifier: format!("{}{}", BLOCKFI_PREFIX, hash_csv_row(row)),
            sequence_index: 0,
            timestamp: ts_sec_to_ms(timestamp),
            location: Location::BlockFi,
            event_type,
            event_subtype,
            asset,
            amount,
            notes: Some(format!("{} from BlockFi", entry_type)),
        }
    }

    /// Classify one transaction row
    ///
    /// Unconfirmed rows (empty `Confirmed At`) are skipped without error.
    pub fn consume_entry(
        &self,
        sink: &mut dyn EventSink,
        row: &RawRow,
        timestamp_format: &str,
    ) -> Result<RowOutcome> {
        let confirmed_at = row.get("Confirmed At")?;
        if confirmed_at.is_empty() {
            debug!("Ignoring unconfirmed BlockFi entry {}", row);
            return Ok(RowOutcome::Skipped(SkipReason::Unconfirmed));
        }

        let timestamp = deserialize_timestamp_from_date(confirmed_at, timestamp_format, "BlockFi")?;
        let asset = self.resolver.resolve(row.get("Cryptocurrency")?)?;
        let raw_amount = deserialize_asset_amount(row.get("Amount")?)?;
        let abs_amount = raw_amount.abs();
        let entry_type = row.get("Transaction Type")?;

        let kind = TransactionKind::parse(entry_type).ok_or_else(|| {
            ImportError::UnsupportedEntry(format!(
                "Unsupported entry {}. Data: {}",
                entry_type, row
            ))
        })?;

        match kind {
            TransactionKind::Deposit
            | TransactionKind::Withdrawal
            | TransactionKind::CryptoTransfer => {
                let category = match kind {
                    TransactionKind::Deposit => MovementCategory::Deposit,
                    TransactionKind::Withdrawal => MovementCategory::Withdrawal,
                    _ if raw_amount < Decimal::ZERO => MovementCategory::Withdrawal,
                    _ => MovementCategory::Deposit,
                };
                let movement = self.movement(category, timestamp, asset, abs_amount);
                let stored = sink.add_asset_movements(&[movement])?;
                Ok(RowOutcome::Emitted { kind: RecordKind::AssetMovement, stored })
            }
            TransactionKind::WithdrawalFee | TransactionKind::Income => {
                let (event_type, event_subtype) = match kind {
                    TransactionKind::WithdrawalFee => {
                        (HistoryEventType::Spend, HistoryEventSubType::Fee)
                    }
                    _ => (HistoryEventType::Receive, HistoryEventSubType::None),
                };
                let event = Self::event(
                    row,
                    entry_type,
                    timestamp,
                    asset,
                    abs_amount,
                    event_type,
                    event_subtype,
                );
                let stored = sink.add_history_events(&[event])?;
                Ok(RowOutcome::Emitted { kind: RecordKind::HistoryEvent, stored })
            }
            TransactionKind::Trade => Ok(RowOutcome::Skipped(SkipReason::Trade)),
        }
    }
}

impl<R: AssetResolver> CsvImporter for BlockFiTransactionsImporter<R> {
    fn location(&self) -> Location {
        Location::BlockFi
    }

    fn consume_row(&self, sink: &mut dyn EventSink, row: &RawRow) -> Result<RowOutcome> {
        self.consume_entry(sink, row, &self.timestamp_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, MemorySink, SqliteSink};
    use crate::importers::{import_reader, ImportSummary};
    use crate::messages::MessageAggregator;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    fn row(confirmed_at: &str, symbol: &str, amount: &str, entry_type: &str) -> RawRow {
        RawRow::new(vec![
            ("Cryptocurrency".to_string(), symbol.to_string()),
            ("Amount".to_string(), amount.to_string()),
            ("Transaction Type".to_string(), entry_type.to_string()),
            ("Confirmed At".to_string(), confirmed_at.to_string()),
        ])
    }

    fn consume(r: &RawRow) -> (Result<RowOutcome>, MemorySink) {
        let importer = BlockFiTransactionsImporter::new();
        let mut sink = MemorySink::new();
        let result = importer.consume_entry(&mut sink, r, FORMAT);
        (result, sink)
    }

    #[test]
    fn test_unconfirmed_row_skipped() {
        let (result, sink) = consume(&row("", "BTC", "1", "Deposit"));
        assert_eq!(result.unwrap(), RowOutcome::Skipped(SkipReason::Unconfirmed));
        assert_eq!(sink.total(), 0);
    }

    #[test]
    fn test_unconfirmed_row_with_garbage_skipped() {
        // Nothing past the confirmation time is looked at
        let (result, sink) = consume(&row("", "NOTACOIN", "ten", "Bogus"));
        assert!(result.is_ok());
        assert_eq!(sink.total(), 0);
    }

    #[test]
    fn test_deposit_types() {
        for entry_type in ["Deposit", "Wire Deposit", "ACH Deposit"] {
            let (result, sink) = consume(&row("2020-09-13 12:26:40", "BTC", "10.5", entry_type));
            assert_eq!(
                result.unwrap(),
                RowOutcome::Emitted { kind: RecordKind::AssetMovement, stored: 1 }
            );
            assert_eq!(sink.movements.len(), 1, "{} should produce a movement", entry_type);

            let movement = &sink.movements[0];
            assert_eq!(movement.category, MovementCategory::Deposit);
            assert_eq!(movement.amount, dec!(10.5));
            assert_eq!(movement.fee, Decimal::ZERO);
            assert_eq!(movement.fee_asset, Asset::usd());
            assert_eq!(movement.asset, Asset::coin("BTC"));
            assert_eq!(movement.timestamp, 1_600_000_000);
            assert_eq!(movement.location, Location::BlockFi);
        }
    }

    #[test]
    fn test_withdrawal_types() {
        for entry_type in ["Withdrawal", "Wire Withdrawal", "ACH Withdrawal"] {
            let (result, sink) = consume(&row("2020-09-13 12:26:40", "ETH", "-2.25", entry_type));
            assert!(result.is_ok());

            let movement = &sink.movements[0];
            assert_eq!(movement.category, MovementCategory::Withdrawal);
            assert_eq!(movement.amount, dec!(2.25));
            assert_eq!(movement.fee, Decimal::ZERO);
        }
    }

    #[test]
    fn test_crypto_transfer_direction_from_sign() {
        let (_, sink) = consume(&row("2020-09-13 12:26:40", "BTC", "-3", "Crypto Transfer"));
        assert_eq!(sink.movements[0].category, MovementCategory::Withdrawal);
        assert_eq!(sink.movements[0].amount, dec!(3));

        let (_, sink) = consume(&row("2020-09-13 12:26:40", "BTC", "3", "Crypto Transfer"));
        assert_eq!(sink.movements[0].category, MovementCategory::Deposit);
        assert_eq!(sink.movements[0].amount, dec!(3));

        // Zero, signed or not, is a deposit
        for zero in ["0", "-0"] {
            let (_, sink) = consume(&row("2020-09-13 12:26:40", "BTC", zero, "Crypto Transfer"));
            assert_eq!(sink.movements[0].category, MovementCategory::Deposit);
            assert!(sink.movements[0].amount.is_zero());
        }
    }

    #[test]
    fn test_withdrawal_fee_event() {
        let r = row("2020-09-13 12:26:40", "ETH", "-0.0025", "Withdrawal Fee");
        let (result, sink) = consume(&r);
        assert_eq!(
            result.unwrap(),
            RowOutcome::Emitted { kind: RecordKind::HistoryEvent, stored: 1 }
        );

        let event = &sink.events[0];
        assert_eq!(event.event_identifier, format!("BLF_{}", hash_csv_row(&r)));
        assert_eq!(event.sequence_index, 0);
        assert_eq!(event.timestamp, 1_600_000_000_000);
        assert_eq!(event.event_type, HistoryEventType::Spend);
        assert_eq!(event.event_subtype, HistoryEventSubType::Fee);
        assert_eq!(event.amount, dec!(0.0025));
        assert_eq!(event.notes.as_deref(), Some("Withdrawal Fee from BlockFi"));
    }

    #[test]
    fn test_event_identifier_idempotent() {
        let a = row("2020-09-13 12:26:40", "ETH", "-0.0025", "Withdrawal Fee");
        let b = row("2020-09-13 12:26:40", "ETH", "-0.0025", "Withdrawal Fee");
        let c = row("2020-09-13 12:26:41", "ETH", "-0.0025", "Withdrawal Fee");

        let (_, sink_a) = consume(&a);
        let (_, sink_b) = consume(&b);
        let (_, sink_c) = consume(&c);

        assert_eq!(sink_a.events[0].event_identifier, sink_b.events[0].event_identifier);
        assert_ne!(sink_a.events[0].event_identifier, sink_c.events[0].event_identifier);
    }

    #[test]
    fn test_income_types() {
        for entry_type in ["Interest Payment", "Bonus Payment", "Referral Bonus"] {
            let (_, sink) = consume(&row("2020-09-13 12:26:40", "GUSD", "0.5", entry_type));
            let event = &sink.events[0];
            assert_eq!(event.event_type, HistoryEventType::Receive);
            assert_eq!(event.event_subtype, HistoryEventSubType::None);
            assert_eq!(event.sequence_index, 0);
            assert!(event.event_identifier.starts_with(BLOCKFI_PREFIX));
            assert_eq!(event.notes, Some(format!("{} from BlockFi", entry_type)));
            assert_eq!(event.asset.symbol, "GUSD");
        }
    }

    #[test]
    fn test_trade_ignored() {
        let (result, sink) = consume(&row("2020-09-13 12:26:40", "BTC", "-1", "Trade"));
        assert_eq!(result.unwrap(), RowOutcome::Skipped(SkipReason::Trade));
        assert_eq!(sink.total(), 0);
    }

    #[test]
    fn test_unsupported_type() {
        let (result, sink) = consume(&row("2020-09-13 12:26:40", "BTC", "1", "Bogus"));
        match result {
            Err(ImportError::UnsupportedEntry(msg)) => {
                assert!(msg.contains("Bogus"));
                assert!(msg.contains("'Cryptocurrency': 'BTC'"));
            }
            other => panic!("expected UnsupportedEntry, got {:?}", other),
        }
        assert_eq!(sink.total(), 0);
    }

    #[test]
    fn test_unknown_asset_and_bad_values() {
        let (result, _) = consume(&row("2020-09-13 12:26:40", "NOTACOIN", "1", "Deposit"));
        assert!(matches!(result, Err(ImportError::UnknownAsset(_))));

        let (result, _) = consume(&row("2020-09-13 12:26:40", "BTC", "abc", "Deposit"));
        assert!(matches!(result, Err(ImportError::Deserialization(_))));

        let (result, _) = consume(&row("13/09/2020", "BTC", "1", "Deposit"));
        assert!(matches!(result, Err(ImportError::Deserialization(_))));
    }

    #[test]
    fn test_missing_column() {
        let r = RawRow::new(vec![
            ("Cryptocurrency".to_string(), "BTC".to_string()),
            ("Transaction Type".to_string(), "Deposit".to_string()),
            ("Confirmed At".to_string(), "2020-09-13 12:26:40".to_string()),
        ]);
        let (result, _) = consume(&r);
        match result {
            Err(ImportError::MissingColumn(key)) => assert_eq!(key, "Amount"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_fee_asset() {
        let importer = BlockFiTransactionsImporter::with_resolver(
            BlockFiAssetResolver::new(),
            FORMAT,
            Asset::coin("EUR"),
        );
        let mut sink = MemorySink::new();
        importer
            .consume_entry(&mut sink, &row("2020-09-13 12:26:40", "BTC", "1", "Deposit"), FORMAT)
            .unwrap();
        assert_eq!(sink.movements[0].fee_asset, Asset::coin("EUR"));
    }

    const SAMPLE: &str = "\
Cryptocurrency,Amount,Transaction Type,Confirmed At
BTC,0.5,Deposit,2020-09-13 12:26:40
BTC,-0.1,Crypto Transfer,2020-09-14 08:00:00
ETH,-0.0025,Withdrawal Fee,2020-09-15 10:00:00
GUSD,1.25,Interest Payment,2020-09-30 23:59:59
BTC,-0.2,Trade,2020-10-01 00:00:00
NOTACOIN,5,Deposit,2020-10-02 00:00:00
BTC,1,Bogus,2020-10-03 00:00:00
BTC,2,Withdrawal,
";

    #[test]
    fn test_import_reader_warnings_and_counts() {
        let importer = BlockFiTransactionsImporter::new();
        let mut sink = MemorySink::new();
        let mut msgs = MessageAggregator::new();

        let summary = import_reader(&importer, &mut sink, SAMPLE.as_bytes(), &mut msgs).unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                rows: 8,
                movements: 2,
                events: 2,
                trades: 0,
                duplicates: 0,
                unconfirmed: 1,
                ignored: 1,
                warnings: 2,
            }
        );

        let warnings = msgs.consume_warnings();
        assert_eq!(
            warnings[0],
            "During BlockFi CSV import found action with unknown asset NOTACOIN. Ignoring entry"
        );
        assert!(warnings[1].starts_with("Unsupported entry Bogus."));
    }

    #[test]
    fn test_import_reader_missing_column_is_fatal() {
        let data = "\
Cryptocurrency,Transaction Type,Confirmed At
BTC,Deposit,2020-09-13 12:26:40
BTC,Deposit,2020-09-14 12:26:40
";
        let importer = BlockFiTransactionsImporter::new();
        let mut sink = MemorySink::new();
        let mut msgs = MessageAggregator::new();

        match import_reader(&importer, &mut sink, data.as_bytes(), &mut msgs) {
            Err(ImportError::Input(msg)) => {
                assert!(msg.starts_with("Could not find key Amount in csv row"));
            }
            other => panic!("expected Input error, got {:?}", other),
        }
        assert_eq!(sink.total(), 0);
        assert!(msgs.warnings().is_empty());
    }

    #[test]
    fn test_reimport_into_sqlite_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        let importer = BlockFiTransactionsImporter::new();

        for round in 0..2 {
            let tx = conn.transaction().unwrap();
            let mut msgs = MessageAggregator::new();
            let summary = {
                let mut sink = SqliteSink::new(&tx);
                import_reader(&importer, &mut sink, SAMPLE.as_bytes(), &mut msgs).unwrap()
            };
            tx.commit().unwrap();

            let expected_duplicates = if round == 0 { 0 } else { 4 };
            assert_eq!(summary.duplicates, expected_duplicates);
        }

        assert_eq!(db::verify_counts(&conn).unwrap(), (2, 2, 0));
    }
}
