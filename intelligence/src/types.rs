//! Core types for the decision engine
//!
//! Field names on the wire follow the swap API (`originChainId`,
//! `totalCostUSD`, ...); chains travel as numeric chain ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gasroute_dataplane::{Chain, ChainRegistry, DataKind};

use crate::error::{OptimizationError, Result};

/// Upper bound on accepted slippage tolerance, in percent
pub const MAX_SLIPPAGE_TOLERANCE_PCT: f64 = 50.0;

/// A swap the user wants priced. Immutable; a new request supersedes the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    /// Chain the user's funds are on
    pub origin_chain_id: Chain,

    /// Token sold, by symbol
    pub token_in: String,

    /// Token bought, by symbol
    pub token_out: String,

    /// Amount of `token_in` as a decimal string (whole units)
    pub amount_in: String,

    /// Slippage tolerance in percent
    pub slippage_tolerance_pct: f64,

    pub deadline_minutes: u32,

    /// Whether proceeds must be bridged back to the origin chain
    #[serde(default)]
    pub return_to_origin: bool,
}

impl SwapRequest {
    pub fn new(origin: Chain, token_in: &str, token_out: &str, amount_in: &str) -> Self {
        Self {
            origin_chain_id: origin,
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in: amount_in.to_string(),
            slippage_tolerance_pct: 0.5,
            deadline_minutes: 30,
            return_to_origin: false,
        }
    }

    pub fn with_slippage(mut self, slippage_tolerance_pct: f64) -> Self {
        self.slippage_tolerance_pct = slippage_tolerance_pct;
        self
    }

    pub fn with_return_to_origin(mut self, return_to_origin: bool) -> Self {
        self.return_to_origin = return_to_origin;
        self
    }

    /// Identity used to deduplicate concurrent evaluations
    pub fn key(&self) -> RequestKey {
        RequestKey(format!(
            "{}:{}:{}:{}:{:?}:{}:{}",
            self.origin_chain_id.chain_id(),
            self.token_in.to_uppercase(),
            self.token_out.to_uppercase(),
            self.amount_in.trim(),
            self.slippage_tolerance_pct,
            self.deadline_minutes,
            self.return_to_origin
        ))
    }

    /// Reject malformed requests before any evaluation; returns the parsed amount
    pub fn validate(&self, registry: &ChainRegistry) -> Result<f64> {
        if !registry.contains(self.origin_chain_id) {
            return Err(OptimizationError::invalid_input(format!(
                "origin chain {} is not supported",
                self.origin_chain_id
            )));
        }

        let token_in = self.token_in.trim();
        let token_out = self.token_out.trim();
        if token_in.is_empty() || token_out.is_empty() {
            return Err(OptimizationError::invalid_input("tokenIn and tokenOut are required"));
        }
        if token_in.eq_ignore_ascii_case(token_out) {
            return Err(OptimizationError::invalid_input(format!(
                "tokenIn and tokenOut are both {}",
                token_in
            )));
        }

        if !self.slippage_tolerance_pct.is_finite()
            || self.slippage_tolerance_pct < 0.0
            || self.slippage_tolerance_pct > MAX_SLIPPAGE_TOLERANCE_PCT
        {
            return Err(OptimizationError::invalid_input(format!(
                "slippageTolerancePct must be within 0..={}, got {}",
                MAX_SLIPPAGE_TOLERANCE_PCT, self.slippage_tolerance_pct
            )));
        }

        if self.deadline_minutes == 0 {
            return Err(OptimizationError::invalid_input("deadlineMinutes must be positive"));
        }

        parse_decimal_amount(&self.amount_in)
    }
}

/// Parse a plain positive decimal string such as `"1000"` or `"0.25"`
///
/// Signs, exponents, `inf` and `NaN` are rejected.
pub fn parse_decimal_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let well_formed = !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
        && trimmed.chars().filter(|&c| c == '.').count() <= 1
        && trimmed.chars().any(|c| c.is_ascii_digit());

    if !well_formed {
        return Err(OptimizationError::invalid_input(format!(
            "amountIn '{}' is not a decimal number",
            raw
        )));
    }

    let amount: f64 = trimmed
        .parse()
        .map_err(|_| OptimizationError::invalid_input(format!("amountIn '{}' is malformed", raw)))?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(OptimizationError::invalid_input(format!(
            "amountIn must be positive, got '{}'",
            raw
        )));
    }
    Ok(amount)
}

/// Deduplication key of a `SwapRequest`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-owned thresholds applied by the optimization policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Minimum savings relative to the origin cost, in basis points
    #[serde(rename = "minSavingsThresholdBPS")]
    pub min_savings_threshold_bps: u32,

    #[serde(rename = "minAbsoluteSavingsUSD")]
    pub min_absolute_savings_usd: f64,

    pub max_bridge_time_seconds: u64,

    pub enable_cross_chain_optimization: bool,

    #[serde(rename = "enableMEVProtection")]
    pub enable_mev_protection: bool,

    /// When non-empty, only these chains are considered as alternatives
    #[serde(default)]
    pub preferred_chains: Vec<Chain>,

    /// Never considered as alternatives
    #[serde(default)]
    pub excluded_chains: Vec<Chain>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            min_savings_threshold_bps: 500,   // 5%
            min_absolute_savings_usd: 10.0,
            max_bridge_time_seconds: 1800,    // 30 minutes
            enable_cross_chain_optimization: true,
            enable_mev_protection: true,
            preferred_chains: Vec::new(),
            excluded_chains: Vec::new(),
        }
    }
}

impl UserPreferences {
    pub fn validate(&self) -> Result<()> {
        if !self.min_absolute_savings_usd.is_finite() || self.min_absolute_savings_usd < 0.0 {
            return Err(OptimizationError::invalid_input(format!(
                "minAbsoluteSavingsUSD must be a non-negative number, got {}",
                self.min_absolute_savings_usd
            )));
        }
        Ok(())
    }

    /// Minimum savings as a percentage
    pub fn min_savings_pct(&self) -> f64 {
        self.min_savings_threshold_bps as f64 / 100.0
    }

    /// Whether `chain` may be compared at all given the origin
    pub fn allows(&self, chain: Chain, origin: Chain) -> bool {
        if chain == origin {
            return true;
        }
        if self.excluded_chains.contains(&chain) {
            return false;
        }
        self.preferred_chains.is_empty() || self.preferred_chains.contains(&chain)
    }
}

/// Cost of executing the swap on one chain. Rebuilt on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainQuote {
    pub chain_id: Chain,
    pub chain_name: String,
    pub gas_price_gwei: f64,
    #[serde(rename = "nativeTokenPriceUSD")]
    pub native_token_price_usd: f64,
    #[serde(rename = "gasCostUSD")]
    pub gas_cost_usd: f64,
    #[serde(rename = "bridgeFeeUSD")]
    pub bridge_fee_usd: f64,
    #[serde(rename = "slippageCostUSD")]
    pub slippage_cost_usd: f64,
    #[serde(rename = "mevProtectionFeeUSD")]
    pub mev_protection_fee_usd: f64,
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
    /// Bridge ETA plus the local swap, or just the local swap on the origin
    pub estimated_execution_time_seconds: u64,
    /// Bridge time to finality; 0 on the origin
    pub bridge_eta_seconds: u64,
    pub bridge_provider: Option<String>,
    pub bridge_success_rate: Option<f64>,
    pub is_origin: bool,
}

impl ChainQuote {
    pub fn breakdown(&self) -> CostBreakdown {
        CostBreakdown {
            gas_cost_usd: self.gas_cost_usd,
            bridge_fee_usd: self.bridge_fee_usd,
            slippage_cost_usd: self.slippage_cost_usd,
            mev_protection_fee_usd: self.mev_protection_fee_usd,
            total_cost_usd: self.total_cost_usd,
        }
    }
}

/// Cost components of one chain's quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(rename = "gasCostUSD")]
    pub gas_cost_usd: f64,
    #[serde(rename = "bridgeFeeUSD")]
    pub bridge_fee_usd: f64,
    #[serde(rename = "slippageCostUSD")]
    pub slippage_cost_usd: f64,
    #[serde(rename = "mevProtectionFeeUSD")]
    pub mev_protection_fee_usd: f64,
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
}

/// Why a chain was left out of the comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingGasPrice,
    MissingNativeTokenPrice,
    MissingBridgeQuote,
    TimedOut { kind: DataKind },
    InvalidData { message: String },
}

/// Non-fatal diagnostic: a non-origin chain could not be compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDataWarning {
    pub chain_id: Chain,
    pub reason: ExclusionReason,
}

/// What the policy recommends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Bridge to the optimal chain and swap there
    Optimize,
    /// Swap locally on the origin chain
    Stay,
}

/// The policy rule that settled the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    CrossChainDisabled,
    InsufficientComparableChains,
    OriginIsCheapest,
    BelowAbsoluteThreshold,
    BelowPercentageThreshold,
    BridgeTooSlow,
    Profitable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn stay(reason: DecisionReason) -> Self {
        Self {
            action: DecisionAction::Stay,
            reason,
        }
    }

    pub fn optimize() -> Self {
        Self {
            action: DecisionAction::Optimize,
            reason: DecisionReason::Profitable,
        }
    }

    pub fn should_optimize(&self) -> bool {
        self.action == DecisionAction::Optimize
    }
}

/// Kind of a bridge plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepKind {
    BridgeOut,
    SwapOnDestination,
    BridgeBack,
}

/// One step of a cross-chain execution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgePlanStep {
    pub step: u32,
    pub kind: PlanStepKind,
    pub description: String,
    pub eta_seconds: u64,
}

/// Bridge disclosure shown alongside a cross-chain recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSummary {
    pub provider: String,
    pub route: Vec<Chain>,
    #[serde(rename = "feeUSD")]
    pub fee_usd: f64,
    pub eta_seconds: u64,
    pub success_rate: f64,
}

/// Point-in-time recommendation. Superseded, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationQuote {
    pub origin_chain_id: Chain,

    /// Recommended chain: the cheapest chain when optimizing, the origin otherwise
    pub optimal_chain_id: Chain,

    /// Minimum-cost entry of `chain_comparisons`, whatever the decision
    pub cheapest_chain_id: Chain,

    #[serde(rename = "originCostUSD")]
    pub origin_cost_usd: f64,

    #[serde(rename = "optimalCostUSD")]
    pub optimal_cost_usd: f64,

    #[serde(rename = "savingsUSD")]
    pub savings_usd: f64,

    pub savings_pct: f64,

    pub should_optimize: bool,

    pub decision: Decision,

    pub requires_bridge: bool,

    pub estimated_execution_time_seconds: u64,

    /// Every comparable chain, ascending by total cost then chain id
    pub chain_comparisons: Vec<ChainQuote>,

    pub bridge_plan: Vec<BridgePlanStep>,

    pub bridge: Option<BridgeSummary>,

    /// Bridge provider's stated success rate; 1.0 for a local swap
    pub confidence: f64,

    pub origin_breakdown: CostBreakdown,

    pub optimal_breakdown: CostBreakdown,

    pub warnings: Vec<PartialDataWarning>,

    pub computed_at_timestamp: DateTime<Utc>,
}

impl OptimizationQuote {
    pub fn comparison_for(&self, chain: Chain) -> Option<&ChainQuote> {
        self.chain_comparisons.iter().find(|q| q.chain_id == chain)
    }
}
