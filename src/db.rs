use crate::error::Result;
use crate::types::{
    Asset, AssetMovement, HistoryEvent, HistoryEventSubType, HistoryEventType, Location,
    MovementCategory, Trade, TradeType,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// SINK TRAIT
// ============================================================================

/// Destination for the records an importer produces
///
/// Each method returns how many records were actually stored. Sinks that
/// deduplicate may store fewer than they were given.
pub trait EventSink {
    fn add_asset_movements(&mut self, movements: &[AssetMovement]) -> Result<usize>;

    fn add_history_events(&mut self, events: &[HistoryEvent]) -> Result<usize>;

    fn add_trades(&mut self, trades: &[Trade]) -> Result<usize>;
}

/// Keeps everything in memory. Used for dry runs and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub movements: Vec<AssetMovement>,
    pub events: Vec<HistoryEvent>,
    pub trades: Vec<Trade>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.movements.len() + self.events.len() + self.trades.len()
    }
}

impl EventSink for MemorySink {
    fn add_asset_movements(&mut self, movements: &[AssetMovement]) -> Result<usize> {
        self.movements.extend_from_slice(movements);
        Ok(movements.len())
    }

    fn add_history_events(&mut self, events: &[HistoryEvent]) -> Result<usize> {
        self.events.extend_from_slice(events);
        Ok(events.len())
    }

    fn add_trades(&mut self, trades: &[Trade]) -> Result<usize> {
        self.trades.extend_from_slice(trades);
        Ok(trades.len())
    }
}

/// Writes into a caller-owned write transaction
///
/// The sink never commits. The caller scopes the transaction around a whole
/// file and decides whether to commit it.
pub struct SqliteSink<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSink<'conn> {
    /// Accepts a `&rusqlite::Transaction` through deref as well
    pub fn new(conn: &'conn Connection) -> Self {
        SqliteSink { conn }
    }
}

impl EventSink for SqliteSink<'_> {
    fn add_asset_movements(&mut self, movements: &[AssetMovement]) -> Result<usize> {
        insert_asset_movements(self.conn, movements)
    }

    fn add_history_events(&mut self, events: &[HistoryEvent]) -> Result<usize> {
        insert_history_events(self.conn, events)
    }

    fn add_trades(&mut self, trades: &[Trade]) -> Result<usize> {
        insert_trades(self.conn, trades)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery. In-memory databases report "memory" and ignore it.
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS asset_movements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            location TEXT NOT NULL,
            category TEXT NOT NULL,
            address TEXT,
            transaction_id TEXT,
            timestamp INTEGER NOT NULL,
            asset TEXT NOT NULL,
            asset_symbol TEXT NOT NULL,
            amount TEXT NOT NULL,
            fee TEXT NOT NULL,
            fee_asset TEXT NOT NULL,
            fee_asset_symbol TEXT NOT NULL,
            link TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS history_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_identifier TEXT NOT NULL,
            sequence_index INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            location TEXT NOT NULL,
            event_type TEXT NOT NULL,
            event_subtype TEXT NOT NULL,
            asset TEXT NOT NULL,
            asset_symbol TEXT NOT NULL,
            amount TEXT NOT NULL,
            notes TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(event_identifier, sequence_index)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS trades (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            timestamp INTEGER NOT NULL,
            location TEXT NOT NULL,
            base_asset TEXT NOT NULL,
            base_asset_symbol TEXT NOT NULL,
            quote_asset TEXT NOT NULL,
            quote_asset_symbol TEXT NOT NULL,
            trade_type TEXT NOT NULL,
            amount TEXT NOT NULL,
            rate TEXT NOT NULL,
            fee TEXT,
            fee_currency TEXT,
            fee_currency_symbol TEXT,
            link TEXT NOT NULL,
            notes TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movements_timestamp ON asset_movements(timestamp)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON history_events(timestamp)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_trades_timestamp ON trades(timestamp)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// INSERTS
// ============================================================================

/// True when the error is a UNIQUE constraint hit, i.e. a re-imported record
fn is_duplicate(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn insert_asset_movements(conn: &Connection, movements: &[AssetMovement]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for movement in movements {
        let result = conn.execute(
            "INSERT INTO asset_movements (
                idempotency_hash, location, category, address, transaction_id, timestamp,
                asset, asset_symbol, amount, fee, fee_asset, fee_asset_symbol, link
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                movement.idempotency_hash(),
                movement.location.code(),
                movement.category.code(),
                movement.address,
                movement.transaction_id,
                movement.timestamp,
                movement.asset.identifier,
                movement.asset.symbol,
                movement.amount.to_string(),
                movement.fee.to_string(),
                movement.fee_asset.identifier,
                movement.fee_asset.symbol,
                movement.link,
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(e) if is_duplicate(&e) => duplicates += 1,
            Err(e) => return Err(e.into()),
        }
    }

    debug!(inserted, duplicates, "stored asset movements");
    Ok(inserted)
}

pub fn insert_history_events(conn: &Connection, events: &[HistoryEvent]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for event in events {
        let result = conn.execute(
            "INSERT INTO history_events (
                event_identifier, sequence_index, timestamp, location, event_type,
                event_subtype, asset, asset_symbol, amount, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.event_identifier,
                event.sequence_index,
                event.timestamp,
                event.location.code(),
                event.event_type.code(),
                event.event_subtype.code(),
                event.asset.identifier,
                event.asset.symbol,
                event.amount.to_string(),
                event.notes,
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(e) if is_duplicate(&e) => duplicates += 1,
            Err(e) => return Err(e.into()),
        }
    }

    debug!(inserted, duplicates, "stored history events");
    Ok(inserted)
}

pub fn insert_trades(conn: &Connection, trades: &[Trade]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for trade in trades {
        let result = conn.execute(
            "INSERT INTO trades (
                idempotency_hash, timestamp, location, base_asset, base_asset_symbol,
                quote_asset, quote_asset_symbol, trade_type, amount, rate, fee,
                fee_currency, fee_currency_symbol, link, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                trade.idempotency_hash(),
                trade.timestamp,
                trade.location.code(),
                trade.base_asset.identifier,
                trade.base_asset.symbol,
                trade.quote_asset.identifier,
                trade.quote_asset.symbol,
                trade.trade_type.code(),
                trade.amount.to_string(),
                trade.rate.to_string(),
                trade.fee.map(|f| f.to_string()),
                trade.fee_currency.as_ref().map(|a| a.identifier.clone()),
                trade.fee_currency.as_ref().map(|a| a.symbol.clone()),
                trade.link,
                trade.notes,
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(e) if is_duplicate(&e) => duplicates += 1,
            Err(e) => return Err(e.into()),
        }
    }

    debug!(inserted, duplicates, "stored trades");
    Ok(inserted)
}

// ============================================================================
// QUERIES
// ============================================================================

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

fn location_column(row: &Row, idx: usize) -> rusqlite::Result<Location> {
    let raw: String = row.get(idx)?;
    match raw.as_str() {
        "blockfi" => Ok(Location::BlockFi),
        other => Err(conversion_error(idx, format!("unknown location {}", other))),
    }
}

fn code_column<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unexpected value {}", raw)))
}

pub fn get_asset_movements(conn: &Connection) -> Result<Vec<AssetMovement>> {
    let mut stmt = conn.prepare(
        "SELECT location, category, address, transaction_id, timestamp, asset, asset_symbol,
                amount, fee, fee_asset, fee_asset_symbol, link
         FROM asset_movements
         ORDER BY timestamp ASC, id ASC",
    )?;

    let movements = stmt
        .query_map([], |row| {
            Ok(AssetMovement {
                location: location_column(row, 0)?,
                category: code_column(row, 1, MovementCategory::from_code)?,
                address: row.get(2)?,
                transaction_id: row.get(3)?,
                timestamp: row.get(4)?,
                asset: Asset {
                    identifier: row.get(5)?,
                    symbol: row.get(6)?,
                },
                amount: decimal_column(row, 7)?,
                fee: decimal_column(row, 8)?,
                fee_asset: Asset {
                    identifier: row.get(9)?,
                    symbol: row.get(10)?,
                },
                link: row.get(11)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(movements)
}

pub fn get_history_events(conn: &Connection) -> Result<Vec<HistoryEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_identifier, sequence_index, timestamp, location, event_type,
                event_subtype, asset, asset_symbol, amount, notes
         FROM history_events
         ORDER BY timestamp ASC, id ASC",
    )?;

    let events = stmt
        .query_map([], |row| {
            Ok(HistoryEvent {
                event_identifier: row.get(0)?,
                sequence_index: row.get(1)?,
                timestamp: row.get(2)?,
                location: location_column(row, 3)?,
                event_type: code_column(row, 4, HistoryEventType::from_code)?,
                event_subtype: code_column(row, 5, HistoryEventSubType::from_code)?,
                asset: Asset {
                    identifier: row.get(6)?,
                    symbol: row.get(7)?,
                },
                amount: decimal_column(row, 8)?,
                notes: row.get(9)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}

pub fn get_trades(conn: &Connection) -> Result<Vec<Trade>> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, location, base_asset, base_asset_symbol, quote_asset,
                quote_asset_symbol, trade_type, amount, rate, fee, fee_currency,
                fee_currency_symbol, link, notes
         FROM trades
         ORDER BY timestamp ASC, id ASC",
    )?;

    let trades = stmt
        .query_map([], |row| {
            let fee: Option<String> = row.get(9)?;
            let fee = match fee {
                Some(raw) => Some(
                    Decimal::from_str(&raw).map_err(|e| conversion_error(9, e.to_string()))?,
                ),
                None => None,
            };
            let fee_currency: Option<String> = row.get(10)?;
            let fee_currency_symbol: Option<String> = row.get(11)?;

            Ok(Trade {
                timestamp: row.get(0)?,
                location: location_column(row, 1)?,
                base_asset: Asset {
                    identifier: row.get(2)?,
                    symbol: row.get(3)?,
                },
                quote_asset: Asset {
                    identifier: row.get(4)?,
                    symbol: row.get(5)?,
                },
                trade_type: code_column(row, 6, TradeType::from_code)?,
                amount: decimal_column(row, 7)?,
                rate: decimal_column(row, 8)?,
                fee,
                fee_currency: fee_currency.map(|identifier| Asset {
                    symbol: fee_currency_symbol.unwrap_or_else(|| identifier.clone()),
                    identifier,
                }),
                link: row.get(12)?,
                notes: row.get(13)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(trades)
}

/// Row counts as (movements, events, trades)
pub fn verify_counts(conn: &Connection) -> Result<(i64, i64, i64)> {
    let movements: i64 =
        conn.query_row("SELECT COUNT(*) FROM asset_movements", [], |row| row.get(0))?;
    let events: i64 =
        conn.query_row("SELECT COUNT(*) FROM history_events", [], |row| row.get(0))?;
    let trades: i64 = conn.query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))?;
    Ok((movements, events, trades))
}
