use crate::assets::{AssetResolver, BlockFiAssetResolver};
use crate::error::{ImportError, Result};
use crate::types::Asset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Format of the `Confirmed At` and `Date` columns in BlockFi exports
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fee asset written on BlockFi movements
///
/// BlockFi never reports movement fees, so the fee is always zero and this
/// asset has no accounting effect. USD is an arbitrary choice.
pub const DEFAULT_FEE_ASSET: &str = "USD";

/// Settings for an import run
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportConfig {
    pub timestamp_format: String,
    pub fee_asset: String,
    /// None means dry run: records are only counted
    pub database: Option<PathBuf>,
    /// Extra symbol -> asset identifier mappings on top of the built-in table
    pub extra_assets: HashMap<String, String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            fee_asset: DEFAULT_FEE_ASSET.to_string(),
            database: None,
            extra_assets: HashMap::new(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ImportConfig = serde_json::from_str(&content)
            .map_err(|e| ImportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timestamp_format.trim().is_empty() {
            return Err(ImportError::Config(
                "timestamp_format cannot be empty".to_string(),
            ));
        }

        if self.fee_asset.trim().is_empty() {
            return Err(ImportError::Config("fee_asset cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Fee asset resolved like any other symbol, or taken as a plain ticker
    pub fn fee_asset(&self) -> Asset {
        let symbol = self.fee_asset.trim();
        self.asset_resolver()
            .resolve(symbol)
            .unwrap_or_else(|_| Asset::coin(&symbol.to_uppercase()))
    }

    /// Built-in BlockFi table plus `extra_assets`
    pub fn asset_resolver(&self) -> BlockFiAssetResolver {
        self.extra_assets.iter().fold(
            BlockFiAssetResolver::new(),
            |resolver, (symbol, identifier)| {
                resolver.with_asset(symbol, Asset::new(identifier, &symbol.to_uppercase()))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.timestamp_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(config.fee_asset(), Asset::usd());
        assert!(config.database.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fee_asset_goes_through_resolver() {
        let config = ImportConfig {
            fee_asset: "usdc".to_string(),
            ..ImportConfig::default()
        };
        assert_eq!(
            config.fee_asset().identifier,
            "eip155:1/erc20:0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
        );

        let config = ImportConfig {
            fee_asset: "chf".to_string(),
            ..ImportConfig::default()
        };
        assert_eq!(config.fee_asset(), Asset::coin("CHF"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"timestamp_format": "%m/%d/%Y %H:%M", "extra_assets": {{"matic": "MATIC"}}}}"#
        )
        .unwrap();

        let config = ImportConfig::load(file.path()).unwrap();
        assert_eq!(config.timestamp_format, "%m/%d/%Y %H:%M");
        assert_eq!(config.fee_asset, DEFAULT_FEE_ASSET);

        let resolver = config.asset_resolver();
        assert_eq!(resolver.resolve("MATIC").unwrap().identifier, "MATIC");
        assert_eq!(resolver.resolve("BTC").unwrap().identifier, "BTC");
    }

    #[test]
    fn test_load_rejects_empty_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timestamp_format": ""}}"#).unwrap();

        match ImportConfig::load(file.path()) {
            Err(ImportError::Config(msg)) => assert!(msg.contains("timestamp_format")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ImportConfig::load(file.path()),
            Err(ImportError::Config(_))
        ));
    }
}
