//! Chain cost evaluator - prices one swap on one chain

use std::sync::Arc;
use tracing::debug;

use gasroute_dataplane::{Chain, DataKind, MarketDataSnapshot};

use super::cost_model;
use crate::config::EngineConfig;
use crate::types::{ChainQuote, ExclusionReason, SwapRequest, UserPreferences};

/// Everything one evaluation reads; shared by every chain
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub request: &'a SwapRequest,
    /// `amountIn` converted to USD at the snapshot's token price
    pub amount_usd: f64,
    pub snapshot: &'a MarketDataSnapshot,
    pub preferences: &'a UserPreferences,
}

/// Combines gas, bridge fee, slippage and MEV protection into a `ChainQuote`
#[derive(Debug, Clone)]
pub struct ChainCostEvaluator {
    config: Arc<EngineConfig>,
}

impl ChainCostEvaluator {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Price the swap on `chain`, or say why the chain cannot be compared
    pub fn evaluate_chain(
        &self,
        input: &EvaluationInput<'_>,
        chain: Chain,
    ) -> std::result::Result<ChainQuote, ExclusionReason> {
        let snapshot = input.snapshot;
        let origin = input.request.origin_chain_id;
        let is_origin = chain == origin;

        let gas_price = snapshot
            .gas_price(chain)
            .ok_or_else(|| missing(snapshot, chain, DataKind::GasPrice, ExclusionReason::MissingGasPrice))?;
        let native_price = snapshot.native_token_price_usd(chain).ok_or_else(|| {
            missing(
                snapshot,
                chain,
                DataKind::NativePrice,
                ExclusionReason::MissingNativeTokenPrice,
            )
        })?;

        let gas_cost_usd = cost_model::gas_cost_usd(
            self.config.swap_gas_units(chain) as f64,
            gas_price.gwei_price,
            native_price,
        )
        .map_err(invalid_data)?;

        let slippage_cost_usd =
            cost_model::slippage_cost_usd(input.amount_usd, input.request.slippage_tolerance_pct)
                .map_err(invalid_data)?;

        let mev_protection_fee_usd = if input.preferences.enable_mev_protection {
            self.config.mev_protection_fee_usd
        } else {
            0.0
        };

        let local_swap_seconds = self.config.timing.local_swap_seconds;

        let (bridge_fee_usd, bridge_eta_seconds, bridge_provider, bridge_success_rate) = if is_origin {
            (0.0, 0, None, None)
        } else {
            let quote = snapshot.bridge_quote(origin, chain).ok_or_else(|| {
                missing(
                    snapshot,
                    chain,
                    DataKind::BridgeQuote,
                    ExclusionReason::MissingBridgeQuote,
                )
            })?;

            if !quote.success_rate.is_finite() || !(0.0..=1.0).contains(&quote.success_rate) {
                return Err(ExclusionReason::InvalidData {
                    message: format!("bridge success rate {} out of range", quote.success_rate),
                });
            }

            let fee = cost_model::bridge_fee_usd(input.amount_usd, quote.base_fee_usd, quote.fee_bps)
                .map_err(invalid_data)?;

            (
                fee,
                quote.eta_seconds,
                Some(quote.provider.clone()),
                Some(quote.success_rate),
            )
        };

        let total_cost_usd = gas_cost_usd + bridge_fee_usd + slippage_cost_usd + mev_protection_fee_usd;

        debug!(
            chain = %chain,
            gas_cost_usd,
            bridge_fee_usd,
            total_cost_usd,
            "Chain evaluated"
        );

        Ok(ChainQuote {
            chain_id: chain,
            chain_name: chain.name().to_string(),
            gas_price_gwei: gas_price.gwei_price,
            native_token_price_usd: native_price,
            gas_cost_usd,
            bridge_fee_usd,
            slippage_cost_usd,
            mev_protection_fee_usd,
            total_cost_usd,
            estimated_execution_time_seconds: bridge_eta_seconds.saturating_add(local_swap_seconds),
            bridge_eta_seconds,
            bridge_provider,
            bridge_success_rate,
            is_origin,
        })
    }
}

/// A timed-out fetch is reported as such; anything else as plain missing data
fn missing(
    snapshot: &MarketDataSnapshot,
    chain: Chain,
    kind: DataKind,
    otherwise: ExclusionReason,
) -> ExclusionReason {
    let timed_out = snapshot
        .failures_for(chain)
        .any(|failure| failure.kind == kind && failure.is_timeout());

    if timed_out {
        ExclusionReason::TimedOut { kind }
    } else {
        otherwise
    }
}

fn invalid_data(error: crate::error::OptimizationError) -> ExclusionReason {
    ExclusionReason::InvalidData {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasroute_dataplane::{BridgeQuote, FetchFailure, FetchFailureReason};

    fn snapshot() -> MarketDataSnapshot {
        MarketDataSnapshot::new()
            .with_gas_price(Chain::Ethereum, 60.0)
            .with_native_price(Chain::Ethereum, 2000.0)
            .with_gas_price(Chain::Arbitrum, 0.1)
            .with_native_price(Chain::Arbitrum, 2000.0)
            .with_bridge_quote(BridgeQuote {
                provider: "across".to_string(),
                source: Chain::Ethereum,
                destination: Chain::Arbitrum,
                base_fee_usd: 2.0,
                fee_bps: 10.0,
                eta_seconds: 600,
                success_rate: 0.98,
            })
    }

    fn evaluator() -> ChainCostEvaluator {
        ChainCostEvaluator::new(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn test_origin_has_no_bridge_fee() {
        let request = SwapRequest::new(Chain::Ethereum, "USDC", "WETH", "1000").with_slippage(0.0);
        let snapshot = snapshot();
        let preferences = UserPreferences::default();
        let input = EvaluationInput {
            request: &request,
            amount_usd: 1000.0,
            snapshot: &snapshot,
            preferences: &preferences,
        };

        let quote = evaluator().evaluate_chain(&input, Chain::Ethereum).unwrap();
        assert!(quote.is_origin);
        assert_eq!(quote.bridge_fee_usd, 0.0);
        assert_eq!(quote.estimated_execution_time_seconds, 30);
        assert!((quote.total_cost_usd - 18.0).abs() < 1e-9);
        assert_eq!(quote.bridge_provider, None);
    }

    #[test]
    fn test_destination_includes_bridge() {
        let request = SwapRequest::new(Chain::Ethereum, "USDC", "WETH", "1000").with_slippage(0.5);
        let snapshot = snapshot();
        let preferences = UserPreferences::default();
        let input = EvaluationInput {
            request: &request,
            amount_usd: 1000.0,
            snapshot: &snapshot,
            preferences: &preferences,
        };

        let quote = evaluator().evaluate_chain(&input, Chain::Arbitrum).unwrap();
        assert!(!quote.is_origin);
        assert!((quote.bridge_fee_usd - 3.0).abs() < 1e-9);
        assert!((quote.slippage_cost_usd - 5.0).abs() < 1e-9);
        assert!((quote.total_cost_usd - 8.03).abs() < 1e-9);
        assert_eq!(quote.estimated_execution_time_seconds, 630);
        assert_eq!(quote.bridge_success_rate, Some(0.98));
    }

    #[test]
    fn test_mev_fee_follows_preference() {
        let config = EngineConfig {
            mev_protection_fee_usd: 1.25,
            ..EngineConfig::default()
        };
        let evaluator = ChainCostEvaluator::new(Arc::new(config));
        let request = SwapRequest::new(Chain::Ethereum, "USDC", "WETH", "1000").with_slippage(0.0);
        let snapshot = snapshot();

        let protected = UserPreferences::default();
        let unprotected = UserPreferences {
            enable_mev_protection: false,
            ..UserPreferences::default()
        };

        let with_fee = evaluator
            .evaluate_chain(
                &EvaluationInput {
                    request: &request,
                    amount_usd: 1000.0,
                    snapshot: &snapshot,
                    preferences: &protected,
                },
                Chain::Ethereum,
            )
            .unwrap();
        let without_fee = evaluator
            .evaluate_chain(
                &EvaluationInput {
                    request: &request,
                    amount_usd: 1000.0,
                    snapshot: &snapshot,
                    preferences: &unprotected,
                },
                Chain::Ethereum,
            )
            .unwrap();

        assert_eq!(with_fee.mev_protection_fee_usd, 1.25);
        assert_eq!(without_fee.mev_protection_fee_usd, 0.0);
        assert!((with_fee.total_cost_usd - without_fee.total_cost_usd - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_missing_inputs_exclude_chain() {
        let request = SwapRequest::new(Chain::Ethereum, "USDC", "WETH", "1000");
        let preferences = UserPreferences::default();
        let snapshot = snapshot()
            .with_native_price(Chain::Base, 2000.0)
            .with_gas_price(Chain::Optimism, 0.01)
            .with_native_price(Chain::Optimism, 2000.0)
            .with_fetch_failure(FetchFailure {
                chain: Chain::Base,
                kind: DataKind::GasPrice,
                reason: FetchFailureReason::Timeout { timeout_ms: 2000 },
            });
        let input = EvaluationInput {
            request: &request,
            amount_usd: 1000.0,
            snapshot: &snapshot,
            preferences: &preferences,
        };

        assert_eq!(
            evaluator().evaluate_chain(&input, Chain::Base),
            Err(ExclusionReason::TimedOut {
                kind: DataKind::GasPrice
            })
        );
        assert_eq!(
            evaluator().evaluate_chain(&input, Chain::Polygon),
            Err(ExclusionReason::MissingGasPrice)
        );
        assert_eq!(
            evaluator().evaluate_chain(&input, Chain::Optimism),
            Err(ExclusionReason::MissingBridgeQuote)
        );
    }

    #[test]
    fn test_huge_bridge_eta_saturates() {
        let request = SwapRequest::new(Chain::Ethereum, "USDC", "WETH", "1000");
        let preferences = UserPreferences::default();
        let snapshot = snapshot().with_bridge_quote(BridgeQuote {
            provider: "slowbridge".to_string(),
            source: Chain::Ethereum,
            destination: Chain::Arbitrum,
            base_fee_usd: 2.0,
            fee_bps: 10.0,
            eta_seconds: u64::MAX - 10,
            success_rate: 0.98,
        });
        let input = EvaluationInput {
            request: &request,
            amount_usd: 1000.0,
            snapshot: &snapshot,
            preferences: &preferences,
        };

        let quote = evaluator().evaluate_chain(&input, Chain::Arbitrum).unwrap();
        assert_eq!(quote.bridge_eta_seconds, u64::MAX - 10);
        assert_eq!(quote.estimated_execution_time_seconds, u64::MAX);
    }
}
