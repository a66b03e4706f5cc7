//! Quote invariants over randomized market data

use proptest::prelude::*;
use std::sync::Arc;

use gasroute_dataplane::{BridgeQuote, Chain, MarketDataSnapshot, StaticMarketDataFeed};
use gasroute_intelligence::{EngineConfig, OptimizationEngine, SwapRequest, UserPreferences};

#[derive(Debug, Clone)]
struct ChainInputs {
    gas_gwei: Option<f64>,
    native_usd: f64,
    bridge_base_fee: f64,
    bridge_fee_bps: f64,
    bridge_eta: u64,
}

fn chain_inputs() -> impl Strategy<Value = ChainInputs> {
    (
        prop::option::weighted(0.85, 0.0f64..200.0),
        1.0f64..5000.0,
        0.0f64..20.0,
        0.0f64..50.0,
        30u64..3600,
    )
        .prop_map(|(gas_gwei, native_usd, bridge_base_fee, bridge_fee_bps, bridge_eta)| ChainInputs {
            gas_gwei,
            native_usd,
            bridge_base_fee,
            bridge_fee_bps,
            bridge_eta,
        })
}

fn preferences() -> impl Strategy<Value = UserPreferences> {
    (0u32..2000, 0.0f64..50.0, 60u64..7200, any::<bool>()).prop_map(
        |(bps, min_usd, max_time, cross_chain)| UserPreferences {
            min_savings_threshold_bps: bps,
            min_absolute_savings_usd: min_usd,
            max_bridge_time_seconds: max_time,
            enable_cross_chain_optimization: cross_chain,
            ..UserPreferences::default()
        },
    )
}

fn build_snapshot(origin: Chain, inputs: &[ChainInputs]) -> MarketDataSnapshot {
    let mut snapshot = MarketDataSnapshot::new().with_token_price("USDC", 1.0);
    for (chain, input) in Chain::ALL.iter().copied().zip(inputs) {
        // The origin always has data so the evaluation has a baseline
        let gas = if chain == origin {
            Some(input.gas_gwei.unwrap_or(10.0))
        } else {
            input.gas_gwei
        };
        if let Some(gwei) = gas {
            snapshot = snapshot.with_gas_price(chain, gwei);
        }
        snapshot = snapshot.with_native_price(chain, input.native_usd);
        if chain != origin {
            snapshot = snapshot.with_bridge_quote(BridgeQuote {
                provider: "across".to_string(),
                source: origin,
                destination: chain,
                base_fee_usd: input.bridge_base_fee,
                fee_bps: input.bridge_fee_bps,
                eta_seconds: input.bridge_eta,
                success_rate: 0.98,
            });
        }
    }
    snapshot
}

fn engine() -> OptimizationEngine {
    OptimizationEngine::new(
        EngineConfig::default(),
        Arc::new(StaticMarketDataFeed::new(MarketDataSnapshot::new())),
    )
}

proptest! {
    #[test]
    fn quote_invariants_hold(
        origin_index in 0usize..5,
        inputs in prop::collection::vec(chain_inputs(), 5),
        amount in 1u32..1_000_000,
        slippage in 0.0f64..5.0,
        prefs in preferences(),
    ) {
        let origin = Chain::ALL[origin_index];
        let snapshot = build_snapshot(origin, &inputs);
        let request = SwapRequest::new(origin, "USDC", "WETH", &amount.to_string())
            .with_slippage(slippage);

        let quote = engine().evaluate(&request, &snapshot, &prefs).unwrap();

        // Ascending by total cost, chain id on ties
        for pair in quote.chain_comparisons.windows(2) {
            prop_assert!(
                pair[0].total_cost_usd < pair[1].total_cost_usd
                    || (pair[0].total_cost_usd == pair[1].total_cost_usd
                        && pair[0].chain_id < pair[1].chain_id)
            );
        }

        prop_assert!(quote.savings_usd >= 0.0);
        let expected = (quote.origin_cost_usd - quote.optimal_cost_usd).max(0.0);
        prop_assert!((quote.savings_usd - expected).abs() < 1e-9);

        if quote.optimal_chain_id == quote.origin_chain_id {
            prop_assert!(!quote.should_optimize);
            prop_assert!(quote.bridge_plan.is_empty());
        } else {
            prop_assert!(quote.should_optimize);
            prop_assert_eq!(quote.optimal_chain_id, quote.chain_comparisons[0].chain_id);
            prop_assert!(quote.estimated_execution_time_seconds <= prefs.max_bridge_time_seconds);
        }

        prop_assert_eq!(quote.cheapest_chain_id, quote.chain_comparisons[0].chain_id);
        prop_assert!(quote.comparison_for(origin).is_some());
        prop_assert_eq!(
            quote.chain_comparisons.len() + quote.warnings.len(),
            Chain::ALL.len()
        );
    }
}
