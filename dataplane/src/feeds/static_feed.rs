//! Fixed market data served from a snapshot
//!
//! Used for deterministic runs, replay of recorded snapshots and tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::feeds::traits::MarketDataProvider;
use crate::{BridgeQuote, Chain, DataplaneError, GasPrice, MarketDataSnapshot, Result};

/// Provider that answers every query from one immutable snapshot
#[derive(Debug, Clone)]
pub struct StaticMarketDataFeed {
    snapshot: Arc<MarketDataSnapshot>,
}

impl StaticMarketDataFeed {
    pub fn new(snapshot: MarketDataSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    /// Load the backing snapshot from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(MarketDataSnapshot::from_file(path)?))
    }

    pub fn snapshot(&self) -> Arc<MarketDataSnapshot> {
        self.snapshot.clone()
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketDataFeed {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn get_gas_price(&self, chain: Chain) -> Result<GasPrice> {
        self.snapshot
            .gas_price(chain)
            .ok_or_else(|| DataplaneError::not_found(format!("gas price for {}", chain)))
    }

    async fn get_native_token_price_usd(&self, chain: Chain) -> Result<f64> {
        self.snapshot
            .native_token_price_usd(chain)
            .ok_or_else(|| DataplaneError::not_found(format!("native token price for {}", chain)))
    }

    async fn get_token_price_usd(&self, symbol: &str) -> Result<f64> {
        self.snapshot
            .token_price_usd(symbol)
            .ok_or_else(|| DataplaneError::not_found(format!("token price for {}", symbol)))
    }

    async fn get_bridge_quote(
        &self,
        source: Chain,
        destination: Chain,
        _amount_usd: f64,
    ) -> Result<BridgeQuote> {
        self.snapshot
            .bridge_quote(source, destination)
            .cloned()
            .ok_or_else(|| {
                DataplaneError::not_found(format!("bridge quote {} -> {}", source, destination))
            })
    }
}
