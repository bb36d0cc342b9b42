// BlockFi trade history importer

use super::{CsvImporter, RecordKind, RowOutcome, SkipReason};
use crate::assets::{AssetResolver, BlockFiAssetResolver};
use crate::config::ImportConfig;
use crate::db::EventSink;
use crate::deserialize::{deserialize_asset_amount, deserialize_timestamp_from_date};
use crate::error::{ImportError, Result};
use crate::row::RawRow;
use crate::types::{Location, Trade, TradeType};
use tracing::debug;

/// Importer for the BlockFi "trades" CSV export
///
/// Every row is recorded as a buy of `Buy Currency` paid with
/// `Sold Currency`.
pub struct BlockFiTradesImporter<R: AssetResolver = BlockFiAssetResolver> {
    resolver: R,
    timestamp_format: String,
}

impl BlockFiTradesImporter {
    pub fn new() -> Self {
        Self::from_config(&ImportConfig::default())
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        BlockFiTradesImporter {
            resolver: config.asset_resolver(),
            timestamp_format: config.timestamp_format.clone(),
        }
    }
}

impl Default for BlockFiTradesImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AssetResolver> BlockFiTradesImporter<R> {
    pub fn with_resolver(resolver: R, timestamp_format: &str) -> Self {
        BlockFiTradesImporter {
            resolver,
            timestamp_format: timestamp_format.to_string(),
        }
    }

    pub fn consume_entry(
        &self,
        sink: &mut dyn EventSink,
        row: &RawRow,
        timestamp_format: &str,
    ) -> Result<RowOutcome> {
        let timestamp = deserialize_timestamp_from_date(row.get("Date")?, timestamp_format, "BlockFi")?;
        let buy_asset = self.resolver.resolve(row.get("Buy Currency")?)?;
        let buy_amount = deserialize_asset_amount(row.get("Buy Quantity")?)?;
        let sold_asset = self.resolver.resolve(row.get("Sold Currency")?)?;
        let sold_amount = deserialize_asset_amount(row.get("Sold Quantity")?)?;

        if sold_amount.is_zero() {
            debug!("Ignoring BlockFi trade with sold_amount equal to zero. {}", row);
            return Ok(RowOutcome::Skipped(SkipReason::ZeroAmount));
        }

        // Zero buy quantity or an out-of-range rate
        let rate = sold_amount
            .checked_div(buy_amount)
            .map(|rate| rate.abs())
            .ok_or_else(|| {
                ImportError::Deserialization(format!(
                    "BlockFi trade rate for {} {} sold for {} {} is undefined",
                    sold_amount.abs(),
                    sold_asset.symbol,
                    buy_amount.abs(),
                    buy_asset.symbol
                ))
            })?;

        let trade = Trade {
            timestamp,
            location: Location::BlockFi,
            base_asset: buy_asset,
            quote_asset: sold_asset,
            trade_type: TradeType::Buy,
            amount: buy_amount.abs(),
            rate,
            fee: None,
            fee_currency: None,
            link: String::new(),
            notes: row.get("Type")?.to_string(),
        };

        let stored = sink.add_trades(&[trade])?;
        Ok(RowOutcome::Emitted { kind: RecordKind::Trade, stored })
    }
}

impl<R: AssetResolver> CsvImporter for BlockFiTradesImporter<R> {
    fn location(&self) -> Location {
        Location::BlockFi
    }

    fn consume_row(&self, sink: &mut dyn EventSink, row: &RawRow) -> Result<RowOutcome> {
        self.consume_entry(sink, row, &self.timestamp_format)
    }
}
