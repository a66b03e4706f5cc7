//! HTTP market data feed
//!
//! Talks to the gas optimization REST API:
//! - `GET {base}/gas-prices/{chainId}`
//! - `GET {base}/chains/{chainId}/native-price`
//! - `GET {base}/tokens/prices/{symbol}`
//! - `GET {base}/bridge/quote?from=&to=&amountUsd=`

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::feeds::traits::MarketDataProvider;
use crate::utils::{retry_with_backoff, timestamp_to_datetime, RetryConfig};
use crate::{BridgeQuote, Chain, DataplaneError, GasPrice, Result};

/// HTTP feed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpFeedConfig {
    /// API base, e.g. `http://localhost:8001/api`
    pub base_url: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Attempts per request, including the first
    pub max_attempts: u32,
}

impl Default for HttpFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001/api".to_string(),
            request_timeout_ms: 800,
            max_attempts: 2,
        }
    }
}

impl HttpFeedConfig {
    /// Longest one fetch can take across every attempt and backoff
    pub fn worst_case_duration(&self) -> Duration {
        let retry = self.retry_config();
        let attempts = retry.max_attempts.max(1);

        let mut total = Duration::from_millis(self.request_timeout_ms).saturating_mul(attempts);
        let mut delay = retry.initial_delay;
        for _ in 1..attempts {
            total = total.saturating_add(delay);
            delay = std::cmp::min(delay.mul_f64(retry.backoff_multiplier), retry.max_delay);
        }
        total
    }

    fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            ..RetryConfig::default()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GasPriceResponse {
    gwei_price: f64,
    /// Unix seconds
    timestamp: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceResponse {
    price_usd: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeQuoteResponse {
    provider: String,
    base_fee_usd: f64,
    fee_bps: f64,
    eta_seconds: u64,
    success_rate: f64,
}

/// Market data provider backed by the REST API
pub struct HttpMarketDataFeed {
    client: Client,
    base_url: Url,
    retry: RetryConfig,
}

impl HttpMarketDataFeed {
    pub fn new(config: &HttpFeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base(&config.base_url)?,
            retry: config.retry_config(),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, operation: &str) -> Result<T> {
        retry_with_backoff(
            || {
                let url = url.clone();
                async move {
                    debug!(url = %url, "GET market data");
                    let response = self.client.get(url.clone()).send().await?;
                    if response.status() == StatusCode::NOT_FOUND {
                        return Err(DataplaneError::not_found(url.to_string()));
                    }
                    let response = response.error_for_status()?;
                    Ok(response.json::<T>().await?)
                }
            },
            &self.retry,
            operation,
        )
        .await
    }
}

fn normalize_base(base: &str) -> Result<Url> {
    if base.ends_with('/') {
        Ok(Url::parse(base)?)
    } else {
        Ok(Url::parse(&format!("{}/", base))?)
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketDataFeed {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get_gas_price(&self, chain: Chain) -> Result<GasPrice> {
        let url = self.endpoint(&format!("gas-prices/{}", chain.chain_id()))?;
        let body: GasPriceResponse = self.get_json(url, "gas_price").await?;
        Ok(GasPrice {
            gwei_price: body.gwei_price,
            timestamp: timestamp_to_datetime(body.timestamp),
        })
    }

    async fn get_native_token_price_usd(&self, chain: Chain) -> Result<f64> {
        let url = self.endpoint(&format!("chains/{}/native-price", chain.chain_id()))?;
        let body: PriceResponse = self.get_json(url, "native_price").await?;
        Ok(body.price_usd)
    }

    async fn get_token_price_usd(&self, symbol: &str) -> Result<f64> {
        let url = self.endpoint(&format!("tokens/prices/{}", symbol.to_uppercase()))?;
        let body: PriceResponse = self.get_json(url, "token_price").await?;
        Ok(body.price_usd)
    }

    async fn get_bridge_quote(
        &self,
        source: Chain,
        destination: Chain,
        amount_usd: f64,
    ) -> Result<BridgeQuote> {
        let mut url = self.endpoint("bridge/quote")?;
        url.query_pairs_mut()
            .append_pair("from", &source.chain_id().to_string())
            .append_pair("to", &destination.chain_id().to_string())
            .append_pair("amountUsd", &amount_usd.to_string());

        let body: BridgeQuoteResponse = self.get_json(url, "bridge_quote").await?;
        Ok(BridgeQuote {
            provider: body.provider,
            source,
            destination,
            base_fee_usd: body.base_fee_usd,
            fee_bps: body.fee_bps,
            eta_seconds: body.eta_seconds,
            success_rate: body.success_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_base_path() {
        let feed = HttpMarketDataFeed::new(&HttpFeedConfig {
            base_url: "http://localhost:8001/api".to_string(),
            ..HttpFeedConfig::default()
        })
        .unwrap();

        assert_eq!(
            feed.endpoint("gas-prices/42161").unwrap().as_str(),
            "http://localhost:8001/api/gas-prices/42161"
        );
    }

    #[test]
    fn test_worst_case_duration_counts_backoff() {
        let config = HttpFeedConfig::default();
        assert_eq!(config.worst_case_duration(), Duration::from_millis(1700));

        let config = HttpFeedConfig {
            request_timeout_ms: 500,
            max_attempts: 3,
            ..HttpFeedConfig::default()
        };
        // 3 x 500ms plus 100ms and 200ms of backoff
        assert_eq!(config.worst_case_duration(), Duration::from_millis(1800));
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        let result = HttpMarketDataFeed::new(&HttpFeedConfig {
            base_url: "not a url".to_string(),
            ..HttpFeedConfig::default()
        });
        assert!(matches!(result, Err(DataplaneError::Url(_))));
    }
}
