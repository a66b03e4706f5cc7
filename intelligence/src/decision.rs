//! Optimization policy
//!
//! Decides whether switching chains is worth it under the user's thresholds
//! and assembles the final `OptimizationQuote`. Rules are checked in order
//! and the first failing rule names the decision reason.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::comparator::Comparison;
use crate::config::PlanSplit;
use crate::error::{OptimizationError, Result};
use crate::intent_builder::BridgePlanBuilder;
use crate::types::{
    BridgeSummary, ChainQuote, Decision, DecisionReason, OptimizationQuote, SwapRequest,
    UserPreferences,
};

/// Float noise allowed on inclusive threshold comparisons
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Savings of a candidate chain relative to the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Savings {
    pub savings_usd: f64,
    pub savings_pct: f64,
}

impl Savings {
    pub const NONE: Savings = Savings {
        savings_usd: 0.0,
        savings_pct: 0.0,
    };

    pub fn between(origin_cost_usd: f64, candidate_cost_usd: f64) -> Self {
        let savings_usd = (origin_cost_usd - candidate_cost_usd).max(0.0);
        let savings_pct = if origin_cost_usd > 0.0 {
            savings_usd * 100.0 / origin_cost_usd
        } else {
            0.0
        };
        Self {
            savings_usd,
            savings_pct,
        }
    }
}

/// Threshold policy plus quote assembly
#[derive(Debug, Clone, Copy)]
pub struct OptimizationPolicy {
    plan_builder: BridgePlanBuilder,
}

impl OptimizationPolicy {
    pub fn new(split: PlanSplit) -> Self {
        Self {
            plan_builder: BridgePlanBuilder::new(split),
        }
    }

    /// Apply the decision rules to a ranked comparison
    pub fn decide(&self, comparison: &Comparison, preferences: &UserPreferences) -> Decision {
        let (origin, cheapest) = match (comparison.origin(), comparison.cheapest()) {
            (Some(origin), Some(cheapest)) => (origin, cheapest),
            _ => return Decision::stay(DecisionReason::InsufficientComparableChains),
        };

        if !preferences.enable_cross_chain_optimization {
            return Decision::stay(DecisionReason::CrossChainDisabled);
        }
        if comparison.quotes.len() < 2 {
            return Decision::stay(DecisionReason::InsufficientComparableChains);
        }
        if cheapest.chain_id == origin.chain_id {
            return Decision::stay(DecisionReason::OriginIsCheapest);
        }

        let savings = Savings::between(origin.total_cost_usd, cheapest.total_cost_usd);

        if savings.savings_usd + THRESHOLD_EPSILON < preferences.min_absolute_savings_usd {
            return Decision::stay(DecisionReason::BelowAbsoluteThreshold);
        }
        if savings.savings_pct + THRESHOLD_EPSILON < preferences.min_savings_pct() {
            return Decision::stay(DecisionReason::BelowPercentageThreshold);
        }
        if cheapest.estimated_execution_time_seconds > preferences.max_bridge_time_seconds {
            return Decision::stay(DecisionReason::BridgeTooSlow);
        }

        Decision::optimize()
    }

    /// Build the recommendation for `request` from a ranked comparison
    pub fn build_quote(
        &self,
        request: &SwapRequest,
        comparison: Comparison,
        preferences: &UserPreferences,
        computed_at: DateTime<Utc>,
    ) -> Result<OptimizationQuote> {
        let origin = comparison.origin().cloned().ok_or_else(|| {
            OptimizationError::missing_market_data(request.origin_chain_id, "origin chain was not priced")
        })?;
        let cheapest_chain_id = comparison
            .cheapest()
            .map(|q| q.chain_id)
            .unwrap_or(origin.chain_id);

        let decision = self.decide(&comparison, preferences);

        let optimal: ChainQuote = if decision.should_optimize() {
            comparison
                .cheapest()
                .cloned()
                .ok_or_else(|| OptimizationError::internal("optimizing without a cheapest chain"))?
        } else {
            origin.clone()
        };

        let savings = if decision.should_optimize() {
            Savings::between(origin.total_cost_usd, optimal.total_cost_usd)
        } else {
            Savings::NONE
        };

        let bridge_plan = self.plan_builder.build(request, &optimal);

        let bridge = match (&optimal.bridge_provider, optimal.bridge_success_rate) {
            (Some(provider), Some(success_rate)) if !optimal.is_origin => {
                let mut route = vec![origin.chain_id, optimal.chain_id];
                if request.return_to_origin {
                    route.push(origin.chain_id);
                }
                Some(BridgeSummary {
                    provider: provider.clone(),
                    route,
                    fee_usd: optimal.bridge_fee_usd,
                    eta_seconds: optimal.bridge_eta_seconds,
                    success_rate,
                })
            }
            _ => None,
        };

        let confidence = bridge.as_ref().map(|b| b.success_rate).unwrap_or(1.0);

        debug!(
            origin = %origin.chain_id,
            optimal = %optimal.chain_id,
            reason = ?decision.reason,
            savings_usd = savings.savings_usd,
            "Optimization decided"
        );

        Ok(OptimizationQuote {
            origin_chain_id: origin.chain_id,
            optimal_chain_id: optimal.chain_id,
            cheapest_chain_id,
            origin_cost_usd: origin.total_cost_usd,
            optimal_cost_usd: optimal.total_cost_usd,
            savings_usd: savings.savings_usd,
            savings_pct: savings.savings_pct,
            should_optimize: decision.should_optimize(),
            decision,
            requires_bridge: !optimal.is_origin,
            estimated_execution_time_seconds: optimal.estimated_execution_time_seconds,
            origin_breakdown: origin.breakdown(),
            optimal_breakdown: optimal.breakdown(),
            bridge_plan,
            bridge,
            confidence,
            chain_comparisons: comparison.quotes,
            warnings: comparison.warnings,
            computed_at_timestamp: computed_at,
        })
    }
}
