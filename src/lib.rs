// BlockFi Import - Core Library
// Exposes all modules for use in the CLI and tests

pub mod abi;
pub mod assets;
pub mod config;
pub mod db;
pub mod deserialize;
pub mod error;
pub mod importers;
pub mod messages;
pub mod row;
pub mod types;

// Re-export commonly used types
pub use abi::{AbiParam, EventAbi};
pub use assets::{AssetResolver, BlockFiAssetResolver};
pub use config::{ImportConfig, DEFAULT_FEE_ASSET, DEFAULT_TIMESTAMP_FORMAT};
pub use db::{
    get_asset_movements, get_history_events, get_trades, setup_database, verify_counts,
    EventSink, MemorySink, SqliteSink,
};
pub use error::{ImportError, Result};
pub use importers::{
    import_csv, import_reader, BlockFiTradesImporter, BlockFiTransactionsImporter, CsvImporter,
    ImportSummary, RecordKind, RowOutcome, SkipReason, TransactionKind, BLOCKFI_PREFIX,
};
pub use messages::MessageAggregator;
pub use row::{hash_csv_row, RawRow};
pub use types::{
    Asset, AssetMovement, HistoryEvent, HistoryEventSubType, HistoryEventType, Location,
    MovementCategory, Trade, TradeType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
