//! Optimization engine - one evaluation cycle from request to quote

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, info_span};
use uuid::Uuid;

use gasroute_dataplane::collector::CollectionRequest;
use gasroute_dataplane::{
    Chain, ChainRegistry, DataKind, MarketDataProvider, MarketDataSnapshot, SnapshotCollector,
};

use crate::comparator::compare_chains;
use crate::config::EngineConfig;
use crate::decision::OptimizationPolicy;
use crate::error::{OptimizationError, Result};
use crate::preferences::PreferencesStore;
use crate::simulator::{ChainCostEvaluator, EvaluationInput};
use crate::types::{OptimizationQuote, SwapRequest, UserPreferences};

/// Evaluates swap requests against market data snapshots
#[derive(Clone)]
pub struct OptimizationEngine {
    config: Arc<EngineConfig>,
    registry: ChainRegistry,
    evaluator: ChainCostEvaluator,
    policy: OptimizationPolicy,
    collector: SnapshotCollector,
}

impl OptimizationEngine {
    pub fn new(config: EngineConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        let config = Arc::new(config);
        Self {
            registry: config.registry(),
            evaluator: ChainCostEvaluator::new(config.clone()),
            policy: OptimizationPolicy::new(config.timing.plan_split),
            collector: SnapshotCollector::new(provider, config.fetch_timeout()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Evaluate against an injected snapshot
    pub fn evaluate(
        &self,
        request: &SwapRequest,
        snapshot: &MarketDataSnapshot,
        preferences: &UserPreferences,
    ) -> Result<OptimizationQuote> {
        self.evaluate_at(request, snapshot, preferences, Utc::now())
    }

    /// Evaluate with an explicit timestamp; identical inputs give identical quotes
    pub fn evaluate_at(
        &self,
        request: &SwapRequest,
        snapshot: &MarketDataSnapshot,
        preferences: &UserPreferences,
        computed_at: DateTime<Utc>,
    ) -> Result<OptimizationQuote> {
        let evaluation_id = Uuid::new_v4();
        let span = info_span!("evaluation", %evaluation_id, origin = %request.origin_chain_id);
        let _guard = span.enter();

        let amount_in = request.validate(&self.registry)?;
        preferences.validate()?;

        let token_price = token_price_usd(snapshot, request)?;
        let amount_usd = amount_in * token_price;
        if !amount_usd.is_finite() {
            return Err(OptimizationError::invalid_input(format!(
                "amount {} {} is out of range",
                request.amount_in, request.token_in
            )));
        }

        let input = EvaluationInput {
            request,
            amount_usd,
            snapshot,
            preferences,
        };
        let comparison = compare_chains(&self.evaluator, &input, &self.registry.chains())?;
        let quote = self
            .policy
            .build_quote(request, comparison, preferences, computed_at)?;

        info!(
            optimal = %quote.optimal_chain_id,
            should_optimize = quote.should_optimize,
            savings_usd = quote.savings_usd,
            compared = quote.chain_comparisons.len(),
            warnings = quote.warnings.len(),
            "Evaluation complete"
        );

        Ok(quote)
    }

    /// Collect fresh market data, then evaluate
    pub async fn get_optimization_quote(
        &self,
        request: &SwapRequest,
        preferences: &UserPreferences,
    ) -> Result<OptimizationQuote> {
        let snapshot = self.collect(request, preferences).await?;
        self.evaluate(request, &snapshot, preferences)
    }

    /// Same as `get_optimization_quote` with the user's stored preferences
    pub async fn get_optimization_quote_for_user(
        &self,
        store: &dyn PreferencesStore,
        user_id: &str,
        request: &SwapRequest,
    ) -> Result<OptimizationQuote> {
        let preferences = store.get_user_preferences(user_id).await?;
        self.get_optimization_quote(request, &preferences).await
    }

    /// Fetch a snapshot covering every chain this request may be compared on
    pub async fn collect(
        &self,
        request: &SwapRequest,
        preferences: &UserPreferences,
    ) -> Result<MarketDataSnapshot> {
        // Malformed requests never reach the market data provider
        let amount_in = request.validate(&self.registry)?;
        preferences.validate()?;

        let origin = request.origin_chain_id;
        let chains: Vec<Chain> = self
            .registry
            .chains()
            .into_iter()
            .filter(|&chain| preferences.allows(chain, origin))
            .collect();

        Ok(self
            .collector
            .collect(&CollectionRequest {
                chains,
                origin,
                token_symbol: request.token_in.trim().to_string(),
                token_amount: amount_in,
            })
            .await)
    }
}

fn token_price_usd(snapshot: &MarketDataSnapshot, request: &SwapRequest) -> Result<f64> {
    let origin = request.origin_chain_id;
    let symbol = request.token_in.trim();

    match snapshot.token_price_usd(symbol) {
        Some(price) if price.is_finite() && price > 0.0 => Ok(price),
        Some(price) => Err(OptimizationError::missing_market_data(
            origin,
            format!("unusable {} price {}", symbol, price),
        )),
        None => {
            let timed_out = snapshot
                .fetch_failures
                .iter()
                .any(|f| f.kind == DataKind::TokenPrice && f.is_timeout());
            let message = if timed_out {
                format!("{} price fetch timed out", symbol)
            } else {
                format!("no {} price", symbol)
            };
            Err(OptimizationError::missing_market_data(origin, message))
        }
    }
}
