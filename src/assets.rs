// Asset resolution - maps exchange symbols to canonical assets

use crate::error::{ImportError, Result};
use crate::types::Asset;
use std::collections::HashMap;

/// Resolves a symbol as written by an exchange into an Asset
pub trait AssetResolver {
    fn resolve(&self, symbol: &str) -> Result<Asset>;
}

/// ERC20 tokens BlockFi lists by ticker
const BLOCKFI_TOKENS: &[(&str, &str)] = &[
    ("AAVE", "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9"),
    ("BAT", "0x0D8775F648430679A709E98d2b0Cb6250d2887EF"),
    ("BUSD", "0x4Fabb145d64652a948d72533023f6E7A623C7C53"),
    ("COMP", "0xc00e94Cb662C3520282E6f5717214004A7f26888"),
    ("DAI", "0x6B175474E89094C44Da98b954EedeAC495271d0F"),
    ("GUSD", "0x056Fd409E1d7A124BD7017459dFEa2F387b6d5Cd"),
    ("LINK", "0x514910771AF9Ca656af840dff83E8264EcF986CA"),
    ("MKR", "0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2"),
    ("PAXG", "0x45804880De22913dAFE09f4980848ECE6EcbAf78"),
    ("SUSHI", "0x6B3595068778DD592e39A122f4f5a5cF09C90fE2"),
    ("UNI", "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
    ("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    ("USDP", "0x8E870D67F660D95d5be530380D0eC0bd388289E1"),
    ("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
    ("1INCH", "0x111111111117dC0aa78b770fA6A738034120C302"),
];

/// Native coins and fiat, identified by their ticker
const BLOCKFI_COINS: &[&str] = &[
    "ADA", "ALGO", "BCH", "BTC", "DOGE", "DOT", "ETH", "LTC", "SOL", "XLM", "USD", "EUR",
    "GBP",
];

/// Tickers BlockFi writes differently from everyone else
const BLOCKFI_RENAMES: &[(&str, &str)] = &[
    // Paxos Standard was rebranded to Pax Dollar
    ("PAX", "USDP"),
    ("XBT", "BTC"),
];

/// Symbol table for BlockFi exports
///
/// Lookups are trimmed and case-insensitive. Extra mappings can be layered on
/// top with `with_asset`.
#[derive(Debug, Clone)]
pub struct BlockFiAssetResolver {
    renames: HashMap<String, String>,
    assets: HashMap<String, Asset>,
}

impl BlockFiAssetResolver {
    pub fn new() -> Self {
        let mut assets = HashMap::new();

        for coin in BLOCKFI_COINS {
            assets.insert(coin.to_string(), Asset::coin(coin));
        }

        for (symbol, address) in BLOCKFI_TOKENS {
            let identifier = format!("eip155:1/erc20:{}", address);
            assets.insert(symbol.to_string(), Asset::new(&identifier, symbol));
        }

        let renames = BLOCKFI_RENAMES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        BlockFiAssetResolver { renames, assets }
    }

    /// Builder pattern: register or override a symbol
    pub fn with_asset(mut self, symbol: &str, asset: Asset) -> Self {
        self.assets.insert(symbol.trim().to_uppercase(), asset);
        self
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for BlockFiAssetResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetResolver for BlockFiAssetResolver {
    fn resolve(&self, symbol: &str) -> Result<Asset> {
        let key = symbol.trim().to_uppercase();
        if key.is_empty() {
            return Err(ImportError::UnknownAsset(symbol.to_string()));
        }

        let key = self.renames.get(&key).cloned().unwrap_or(key);
        self.assets
            .get(&key)
            .cloned()
            .ok_or_else(|| ImportError::UnknownAsset(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_coin() {
        let resolver = BlockFiAssetResolver::new();
        let btc = resolver.resolve("BTC").unwrap();
        assert_eq!(btc.identifier, "BTC");
        assert_eq!(btc.symbol, "BTC");
    }

    #[test]
    fn test_resolve_token_case_insensitive() {
        let resolver = BlockFiAssetResolver::new();
        let gusd = resolver.resolve(" gusd ").unwrap();
        assert_eq!(
            gusd.identifier,
            "eip155:1/erc20:0x056Fd409E1d7A124BD7017459dFEa2F387b6d5Cd"
        );
        assert_eq!(gusd.symbol, "GUSD");
    }

    #[test]
    fn test_resolve_rename() {
        let resolver = BlockFiAssetResolver::new();
        let pax = resolver.resolve("PAX").unwrap();
        assert_eq!(pax.symbol, "USDP");
    }

    #[test]
    fn test_unknown_asset() {
        let resolver = BlockFiAssetResolver::new();
        match resolver.resolve("NOTACOIN") {
            Err(ImportError::UnknownAsset(symbol)) => assert_eq!(symbol, "NOTACOIN"),
            other => panic!("expected UnknownAsset, got {:?}", other),
        }
        assert!(resolver.resolve("").is_err());
    }

    #[test]
    fn test_with_asset_extends_table() {
        let resolver = BlockFiAssetResolver::new().with_asset("matic", Asset::coin("MATIC"));
        assert_eq!(resolver.resolve("MATIC").unwrap().identifier, "MATIC");
    }
}
