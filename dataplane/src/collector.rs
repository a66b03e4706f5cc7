//! Concurrent market data collection into an immutable snapshot
//!
//! Every fetch runs concurrently and is bounded by `fetch_timeout`. A fetch
//! that times out or errors leaves its value absent and is recorded in
//! `fetch_failures`; collection as a whole never fails on one chain.

use chrono::Utc;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::feeds::MarketDataProvider;
use crate::utils::with_timeout;
use crate::{
    Chain, DataKind, DataplaneError, FetchFailure, FetchFailureReason, MarketDataSnapshot,
};

/// What to collect for one swap evaluation
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    /// Chains to price
    pub chains: Vec<Chain>,
    /// Chain the funds start on; bridge quotes are fetched origin -> each other chain
    pub origin: Chain,
    /// Token being sold
    pub token_symbol: String,
    /// Token amount being sold, in whole units
    pub token_amount: f64,
}

/// Builds `MarketDataSnapshot`s from a `MarketDataProvider`
#[derive(Clone)]
pub struct SnapshotCollector {
    provider: Arc<dyn MarketDataProvider>,
    fetch_timeout: Duration,
}

impl SnapshotCollector {
    pub fn new(provider: Arc<dyn MarketDataProvider>, fetch_timeout: Duration) -> Self {
        Self {
            provider,
            fetch_timeout,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Collect a fresh snapshot
    pub async fn collect(&self, request: &CollectionRequest) -> MarketDataSnapshot {
        let started = Instant::now();
        let mut snapshot = MarketDataSnapshot::at(Utc::now());
        let provider = self.provider.as_ref();

        let gas_fetches = request.chains.iter().map(|&chain| async move {
            let result = self
                .bounded(chain, DataKind::GasPrice, provider.get_gas_price(chain))
                .await;
            (chain, result)
        });
        let native_fetches = request.chains.iter().map(|&chain| async move {
            let result = self
                .bounded(
                    chain,
                    DataKind::NativePrice,
                    provider.get_native_token_price_usd(chain),
                )
                .await;
            (chain, result)
        });
        let token_fetch = self.bounded(
            request.origin,
            DataKind::TokenPrice,
            provider.get_token_price_usd(&request.token_symbol),
        );

        let (gas_prices, native_prices, token_price) = futures::join!(
            join_all(gas_fetches),
            join_all(native_fetches),
            token_fetch
        );

        for (chain, result) in gas_prices {
            match result {
                Ok(gas_price) => {
                    snapshot.chains.entry(chain).or_default().gas_price = Some(gas_price);
                }
                Err(failure) => snapshot.fetch_failures.push(failure),
            }
        }
        for (chain, result) in native_prices {
            match result {
                Ok(price) => {
                    snapshot.chains.entry(chain).or_default().native_token_price_usd = Some(price);
                }
                Err(failure) => snapshot.fetch_failures.push(failure),
            }
        }

        let amount_usd = match token_price {
            Ok(price) => {
                snapshot
                    .token_prices_usd
                    .insert(request.token_symbol.to_uppercase(), price);
                Some(price * request.token_amount)
            }
            Err(failure) => {
                snapshot.fetch_failures.push(failure);
                None
            }
        };

        // Bridge fees scale with the USD amount, so they wait on the token price
        if let Some(amount_usd) = amount_usd {
            let bridge_fetches = request
                .chains
                .iter()
                .copied()
                .filter(|&chain| chain != request.origin)
                .map(|destination| async move {
                    self.bounded(
                        destination,
                        DataKind::BridgeQuote,
                        provider.get_bridge_quote(request.origin, destination, amount_usd),
                    )
                    .await
                });

            for result in join_all(bridge_fetches).await {
                match result {
                    Ok(quote) => snapshot.bridge_quotes.push(quote),
                    Err(failure) => snapshot.fetch_failures.push(failure),
                }
            }
        } else {
            debug!(
                token = %request.token_symbol,
                "Skipping bridge quotes, token price unavailable"
            );
        }

        info!(
            provider = provider.name(),
            chains = request.chains.len(),
            failures = snapshot.fetch_failures.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Market data snapshot collected"
        );

        snapshot
    }

    /// Run one fetch under the timeout, mapping any failure to a `FetchFailure`
    async fn bounded<T, F>(
        &self,
        chain: Chain,
        kind: DataKind,
        fetch: F,
    ) -> std::result::Result<T, FetchFailure>
    where
        F: Future<Output = crate::Result<T>>,
    {
        let operation = format!("{:?}:{}", kind, chain);
        with_timeout(fetch, self.fetch_timeout, &operation)
            .await
            .map_err(|error| {
                let reason = match error {
                    DataplaneError::Timeout { timeout_ms, .. } => {
                        FetchFailureReason::Timeout { timeout_ms }
                    }
                    other => {
                        warn!(chain = %chain, kind = ?kind, error = %other, "Market data fetch failed");
                        FetchFailureReason::Unavailable {
                            message: other.to_string(),
                        }
                    }
                };
                FetchFailure {
                    chain,
                    kind,
                    reason,
                }
            })
    }
}
