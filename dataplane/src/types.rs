//! Market data types shared with the decision engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{Chain, Result};

/// Gas price observation for one chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    /// Standard-speed gas price in gwei
    pub gwei_price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Bridge provider quote for one source -> destination pair
///
/// Carries the provider's fee schedule; the USD fee for a given amount is
/// derived from it by the engine's cost model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeQuote {
    pub provider: String,
    pub source: Chain,
    pub destination: Chain,
    /// Flat fee in USD
    pub base_fee_usd: f64,
    /// Proportional fee in basis points of the bridged amount
    pub fee_bps: f64,
    /// Time to finality on the destination
    pub eta_seconds: u64,
    /// Provider's stated success rate (0.0 to 1.0)
    pub success_rate: f64,
}

/// Per-chain inputs; either value may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMarketData {
    #[serde(default)]
    pub gas_price: Option<GasPrice>,
    #[serde(default)]
    pub native_token_price_usd: Option<f64>,
}

/// Which input a failed fetch was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    GasPrice,
    NativePrice,
    TokenPrice,
    BridgeQuote,
}

/// Why a fetch produced no value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchFailureReason {
    Timeout { timeout_ms: u64 },
    Unavailable { message: String },
}

/// A fetch that did not contribute to the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailure {
    pub chain: Chain,
    pub kind: DataKind,
    pub reason: FetchFailureReason,
}

impl FetchFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self.reason, FetchFailureReason::Timeout { .. })
    }
}

/// Point-in-time, read-only view of every market input one evaluation needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataSnapshot {
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub chains: BTreeMap<Chain, ChainMarketData>,
    /// USD price per token, keyed by upper-case symbol
    #[serde(default)]
    pub token_prices_usd: BTreeMap<String, f64>,
    #[serde(default)]
    pub bridge_quotes: Vec<BridgeQuote>,
    #[serde(default)]
    pub fetch_failures: Vec<FetchFailure>,
}

impl MarketDataSnapshot {
    /// Empty snapshot stamped with the current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Empty snapshot with an explicit timestamp
    pub fn at(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            chains: BTreeMap::new(),
            token_prices_usd: BTreeMap::new(),
            bridge_quotes: Vec::new(),
            fetch_failures: Vec::new(),
        }
    }

    /// Load a snapshot from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_gas_price(mut self, chain: Chain, gwei_price: f64) -> Self {
        let taken_at = self.taken_at;
        self.chains.entry(chain).or_default().gas_price = Some(GasPrice {
            gwei_price,
            timestamp: taken_at,
        });
        self
    }

    pub fn with_native_price(mut self, chain: Chain, price_usd: f64) -> Self {
        self.chains.entry(chain).or_default().native_token_price_usd = Some(price_usd);
        self
    }

    pub fn with_token_price(mut self, symbol: &str, price_usd: f64) -> Self {
        self.token_prices_usd
            .insert(symbol.to_uppercase(), price_usd);
        self
    }

    pub fn with_bridge_quote(mut self, quote: BridgeQuote) -> Self {
        self.bridge_quotes
            .retain(|q| !(q.source == quote.source && q.destination == quote.destination));
        self.bridge_quotes.push(quote);
        self
    }

    pub fn with_fetch_failure(mut self, failure: FetchFailure) -> Self {
        self.fetch_failures.push(failure);
        self
    }

    pub fn gas_price(&self, chain: Chain) -> Option<GasPrice> {
        self.chains.get(&chain).and_then(|data| data.gas_price)
    }

    pub fn native_token_price_usd(&self, chain: Chain) -> Option<f64> {
        self.chains
            .get(&chain)
            .and_then(|data| data.native_token_price_usd)
    }

    pub fn token_price_usd(&self, symbol: &str) -> Option<f64> {
        self.token_prices_usd.get(&symbol.to_uppercase()).copied()
    }

    pub fn bridge_quote(&self, source: Chain, destination: Chain) -> Option<&BridgeQuote> {
        self.bridge_quotes
            .iter()
            .find(|q| q.source == source && q.destination == destination)
    }

    /// Fetch failures recorded for one chain
    pub fn failures_for(&self, chain: Chain) -> impl Iterator<Item = &FetchFailure> {
        self.fetch_failures.iter().filter(move |f| f.chain == chain)
    }
}

impl Default for MarketDataSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbitrum_quote(fee_bps: f64) -> BridgeQuote {
        BridgeQuote {
            provider: "across".to_string(),
            source: Chain::Ethereum,
            destination: Chain::Arbitrum,
            base_fee_usd: 2.0,
            fee_bps,
            eta_seconds: 600,
            success_rate: 0.98,
        }
    }

    #[test]
    fn test_builder_lookups() {
        let snapshot = MarketDataSnapshot::new()
            .with_gas_price(Chain::Ethereum, 60.0)
            .with_native_price(Chain::Ethereum, 2000.0)
            .with_token_price("usdc", 1.0)
            .with_bridge_quote(arbitrum_quote(10.0));

        assert_eq!(snapshot.gas_price(Chain::Ethereum).unwrap().gwei_price, 60.0);
        assert_eq!(snapshot.native_token_price_usd(Chain::Ethereum), Some(2000.0));
        assert_eq!(snapshot.native_token_price_usd(Chain::Base), None);
        assert_eq!(snapshot.token_price_usd("USDC"), Some(1.0));
        assert!(snapshot.bridge_quote(Chain::Ethereum, Chain::Arbitrum).is_some());
        assert!(snapshot.bridge_quote(Chain::Arbitrum, Chain::Ethereum).is_none());
    }

    #[test]
    fn test_bridge_quote_replaced_per_pair() {
        let snapshot = MarketDataSnapshot::new()
            .with_bridge_quote(arbitrum_quote(10.0))
            .with_bridge_quote(arbitrum_quote(5.0));

        assert_eq!(snapshot.bridge_quotes.len(), 1);
        assert_eq!(
            snapshot.bridge_quote(Chain::Ethereum, Chain::Arbitrum).unwrap().fee_bps,
            5.0
        );
    }

    #[test]
    fn test_snapshot_json_uses_chain_ids() {
        let snapshot = MarketDataSnapshot::new()
            .with_gas_price(Chain::Base, 0.01)
            .with_native_price(Chain::Base, 2000.0);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["chains"]["8453"]["gasPrice"]["gweiPrice"].is_number());

        let back: MarketDataSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
