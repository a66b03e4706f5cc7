//! Bridge plan builder
//!
//! Turns a cross-chain recommendation into ordered execution steps. Step
//! ETAs are fixed fractions of the bridge ETA taken from configuration.

use gasroute_dataplane::Chain;

use crate::config::PlanSplit;
use crate::types::{BridgePlanStep, ChainQuote, PlanStepKind, SwapRequest};

/// Builds bridge plans for quotes that leave the origin chain
#[derive(Debug, Clone, Copy)]
pub struct BridgePlanBuilder {
    split: PlanSplit,
}

impl BridgePlanBuilder {
    pub fn new(split: PlanSplit) -> Self {
        Self { split }
    }

    /// Plan for executing `request` on `destination`; empty when it is the origin
    pub fn build(&self, request: &SwapRequest, destination: &ChainQuote) -> Vec<BridgePlanStep> {
        let origin = request.origin_chain_id;
        if destination.chain_id == origin {
            return Vec::new();
        }

        let eta = destination.bridge_eta_seconds;
        let via = destination
            .bridge_provider
            .as_deref()
            .map(|p| format!(" via {}", p))
            .unwrap_or_default();

        let mut steps = vec![
            BridgePlanStep {
                step: 1,
                kind: PlanStepKind::BridgeOut,
                description: format!(
                    "Bridge {} {} from {} to {}{}",
                    request.amount_in.trim(),
                    request.token_in,
                    origin,
                    destination.chain_id,
                    via
                ),
                eta_seconds: portion(eta, self.split.bridge_out),
            },
            BridgePlanStep {
                step: 2,
                kind: PlanStepKind::SwapOnDestination,
                description: format!(
                    "Swap {} for {} on {}",
                    request.token_in, request.token_out, destination.chain_id
                ),
                eta_seconds: portion(eta, self.split.swap),
            },
        ];

        if request.return_to_origin {
            steps.push(bridge_back(request, destination.chain_id, &via, portion(eta, self.split.bridge_back)));
        }

        steps
    }
}

fn bridge_back(request: &SwapRequest, from: Chain, via: &str, eta_seconds: u64) -> BridgePlanStep {
    BridgePlanStep {
        step: 3,
        kind: PlanStepKind::BridgeBack,
        description: format!(
            "Bridge {} from {} back to {}{}",
            request.token_out, from, request.origin_chain_id, via
        ),
        eta_seconds,
    }
}

fn portion(eta_seconds: u64, fraction: f64) -> u64 {
    (eta_seconds as f64 * fraction).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbitrum_quote() -> ChainQuote {
        ChainQuote {
            chain_id: Chain::Arbitrum,
            chain_name: "Arbitrum".to_string(),
            gas_price_gwei: 0.1,
            native_token_price_usd: 2000.0,
            gas_cost_usd: 0.03,
            bridge_fee_usd: 3.0,
            slippage_cost_usd: 0.0,
            mev_protection_fee_usd: 0.0,
            total_cost_usd: 3.03,
            estimated_execution_time_seconds: 630,
            bridge_eta_seconds: 600,
            bridge_provider: Some("across".to_string()),
            bridge_success_rate: Some(0.98),
            is_origin: false,
        }
    }

    #[test]
    fn test_plan_split() {
        let builder = BridgePlanBuilder::new(PlanSplit::default());
        let request = SwapRequest::new(Chain::Ethereum, "USDC", "WETH", "1000");
        let steps = builder.build(&request, &arbitrum_quote());

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, PlanStepKind::BridgeOut);
        assert_eq!(steps[0].eta_seconds, 360);
        assert_eq!(steps[1].kind, PlanStepKind::SwapOnDestination);
        assert_eq!(steps[1].eta_seconds, 120);
        assert_eq!(
            steps[0].description,
            "Bridge 1000 USDC from Ethereum to Arbitrum via across"
        );
    }

    #[test]
    fn test_bridge_back_step() {
        let builder = BridgePlanBuilder::new(PlanSplit::default());
        let request =
            SwapRequest::new(Chain::Ethereum, "USDC", "WETH", "1000").with_return_to_origin(true);
        let steps = builder.build(&request, &arbitrum_quote());

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].step, 3);
        assert_eq!(steps[2].kind, PlanStepKind::BridgeBack);
        assert_eq!(steps[2].eta_seconds, 120);
    }

    #[test]
    fn test_no_plan_for_origin() {
        let builder = BridgePlanBuilder::new(PlanSplit::default());
        let request = SwapRequest::new(Chain::Arbitrum, "USDC", "WETH", "1000");
        assert!(builder.build(&request, &arbitrum_quote()).is_empty());
    }
}
