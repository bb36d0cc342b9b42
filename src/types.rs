// Domain records produced by the importers
// Movements, history events and trades all carry a Location and an Asset

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Unix timestamp in milliseconds
pub type TimestampMs = i64;

pub fn ts_sec_to_ms(ts: Timestamp) -> TimestampMs {
    ts * 1000
}

// ============================================================================
// LOCATION & ASSET
// ============================================================================

/// Where a record comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    BlockFi,
}

impl Location {
    /// Serialized name, also used in the database
    pub fn code(&self) -> &'static str {
        match self {
            Location::BlockFi => "blockfi",
        }
    }

    /// Human-readable name for notes and warnings
    pub fn name(&self) -> &'static str {
        match self {
            Location::BlockFi => "BlockFi",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Asset identified by its canonical identifier
///
/// Plain coins use their ticker (`BTC`), tokens use a CAIP-19 style id
/// (`eip155:1/erc20:0x...`). The symbol is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub identifier: String,
    pub symbol: String,
}

impl Asset {
    pub fn new(identifier: &str, symbol: &str) -> Self {
        Asset {
            identifier: identifier.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// Asset whose identifier is its own symbol
    pub fn coin(symbol: &str) -> Self {
        Asset::new(symbol, symbol)
    }

    pub fn usd() -> Self {
        Asset::coin("USD")
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

// ============================================================================
// ASSET MOVEMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementCategory {
    /// Funds coming into the account
    Deposit,
    /// Funds leaving the account
    Withdrawal,
}

impl MovementCategory {
    pub fn code(&self) -> &'static str {
        match self {
            MovementCategory::Deposit => "deposit",
            MovementCategory::Withdrawal => "withdrawal",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "deposit" => Some(MovementCategory::Deposit),
            "withdrawal" => Some(MovementCategory::Withdrawal),
            _ => None,
        }
    }
}

/// Deposit or withdrawal of an asset at an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMovement {
    pub location: Location,
    pub category: MovementCategory,
    pub address: Option<String>,
    pub transaction_id: Option<String>,
    pub timestamp: Timestamp,
    pub asset: Asset,
    pub amount: Decimal,
    pub fee: Decimal,
    pub fee_asset: Asset,
    pub link: String,
}

impl AssetMovement {
    /// Key used to skip movements already stored by a previous import
    pub fn idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.location.code(),
            self.category.code(),
            self.timestamp,
            self.asset.identifier,
            self.amount.normalize(),
            self.fee.normalize(),
            self.fee_asset.identifier,
            self.link,
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// HISTORY EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryEventType {
    Receive,
    Spend,
}

impl HistoryEventType {
    pub fn code(&self) -> &'static str {
        match self {
            HistoryEventType::Receive => "receive",
            HistoryEventType::Spend => "spend",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "receive" => Some(HistoryEventType::Receive),
            "spend" => Some(HistoryEventType::Spend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryEventSubType {
    None,
    Fee,
}

impl HistoryEventSubType {
    pub fn code(&self) -> &'static str {
        match self {
            HistoryEventSubType::None => "none",
            HistoryEventSubType::Fee => "fee",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "none" => Some(HistoryEventSubType::None),
            "fee" => Some(HistoryEventSubType::Fee),
            _ => None,
        }
    }
}

/// Timestamped accounting record such as a fee or an interest payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_identifier: String,
    pub sequence_index: u32,
    pub timestamp: TimestampMs,
    pub location: Location,
    pub event_type: HistoryEventType,
    pub event_subtype: HistoryEventSubType,
    pub asset: Asset,
    pub amount: Decimal,
    pub notes: Option<String>,
}

// ============================================================================
// TRADES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn code(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "buy" => Some(TradeType::Buy),
            "sell" => Some(TradeType::Sell),
            _ => None,
        }
    }
}

/// Exchange of `amount` of the base asset at `rate` units of quote per base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: Timestamp,
    pub location: Location,
    pub base_asset: Asset,
    pub quote_asset: Asset,
    pub trade_type: TradeType,
    pub amount: Decimal,
    pub rate: Decimal,
    pub fee: Option<Decimal>,
    pub fee_currency: Option<Asset>,
    pub link: String,
    pub notes: String,
}

impl Trade {
    pub fn idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.location.code(),
            self.timestamp,
            self.base_asset.identifier,
            self.quote_asset.identifier,
            self.trade_type.code(),
            self.amount.normalize(),
            self.rate.normalize(),
            self.link,
        ));
        format!("{:x}", hasher.finalize())
    }
}
