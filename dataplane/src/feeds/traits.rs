//! Provider interface for live market inputs

use async_trait::async_trait;

use crate::{BridgeQuote, Chain, GasPrice, Result};

/// Source of gas prices, token prices and bridge quotes
///
/// Implementations may be slow or fail per call; the collector bounds every
/// call with a timeout and treats failures as missing data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Current standard gas price on a chain
    async fn get_gas_price(&self, chain: Chain) -> Result<GasPrice>;

    /// USD price of the chain's native (gas) token
    async fn get_native_token_price_usd(&self, chain: Chain) -> Result<f64>;

    /// USD price of a token by symbol
    async fn get_token_price_usd(&self, symbol: &str) -> Result<f64>;

    /// Bridge fee schedule, ETA and success rate for moving `amount_usd`
    async fn get_bridge_quote(
        &self,
        source: Chain,
        destination: Chain,
        amount_usd: f64,
    ) -> Result<BridgeQuote>;
}
