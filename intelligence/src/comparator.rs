//! Multi-chain comparator
//!
//! Runs the chain evaluator over every candidate chain and ranks the results.
//! Non-origin chains with unusable data are dropped with a warning; the
//! origin is the savings baseline, so its absence fails the comparison.

use tracing::{debug, warn};

use gasroute_dataplane::Chain;

use crate::error::{OptimizationError, Result};
use crate::simulator::{ChainCostEvaluator, EvaluationInput};
use crate::types::{ChainQuote, ExclusionReason, PartialDataWarning};

/// Ranked chain quotes plus the chains that could not be compared
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Ascending by total cost, ties broken by chain id
    pub quotes: Vec<ChainQuote>,
    pub warnings: Vec<PartialDataWarning>,
}

impl Comparison {
    pub fn origin(&self) -> Option<&ChainQuote> {
        self.quotes.iter().find(|q| q.is_origin)
    }

    pub fn cheapest(&self) -> Option<&ChainQuote> {
        self.quotes.first()
    }
}

/// Compare the swap across `supported_chains`
///
/// The origin is always evaluated; other chains are subject to the user's
/// preferred / excluded lists.
pub fn compare_chains(
    evaluator: &ChainCostEvaluator,
    input: &EvaluationInput<'_>,
    supported_chains: &[Chain],
) -> Result<Comparison> {
    let origin = input.request.origin_chain_id;

    let mut candidates: Vec<Chain> = supported_chains
        .iter()
        .copied()
        .filter(|&chain| input.preferences.allows(chain, origin))
        .collect();
    if !candidates.contains(&origin) {
        candidates.push(origin);
    }
    candidates.sort();
    candidates.dedup();

    let mut quotes = Vec::with_capacity(candidates.len());
    let mut warnings = Vec::new();

    for chain in candidates {
        match evaluator.evaluate_chain(input, chain) {
            Ok(quote) => quotes.push(quote),
            Err(reason) if chain == origin => {
                return Err(OptimizationError::missing_market_data(
                    origin,
                    describe(&reason),
                ));
            }
            Err(reason) => {
                warn!(chain = %chain, reason = ?reason, "Chain excluded from comparison");
                warnings.push(PartialDataWarning {
                    chain_id: chain,
                    reason,
                });
            }
        }
    }

    sort_quotes(&mut quotes);

    debug!(
        compared = quotes.len(),
        excluded = warnings.len(),
        "Chains compared"
    );

    Ok(Comparison { quotes, warnings })
}

/// Ascending total cost; equal totals fall back to the lower chain id
pub fn sort_quotes(quotes: &mut [ChainQuote]) {
    quotes.sort_by(|a, b| {
        a.total_cost_usd
            .total_cmp(&b.total_cost_usd)
            .then_with(|| a.chain_id.cmp(&b.chain_id))
    });
}

fn describe(reason: &ExclusionReason) -> String {
    match reason {
        ExclusionReason::MissingGasPrice => "no gas price".to_string(),
        ExclusionReason::MissingNativeTokenPrice => "no native token price".to_string(),
        ExclusionReason::MissingBridgeQuote => "no bridge quote".to_string(),
        ExclusionReason::TimedOut { kind } => format!("{:?} fetch timed out", kind),
        ExclusionReason::InvalidData { message } => message.clone(),
    }
}
