//! Gasroute Intelligence
//!
//! Cross-chain cost optimization decision engine: given a swap request and a
//! market data snapshot, prices the swap on every supported chain, decides
//! whether bridging to a cheaper chain is worth it under the user's
//! thresholds, and produces a structured recommendation.
//!
//! ## Pipeline
//! 1. **simulator**: cost model and per-chain evaluation
//! 2. **comparator**: ranking across chains
//! 3. **decision**: threshold policy and quote assembly
//! 4. **controller**: debounced, latest-request-wins refresh loop

pub mod comparator;
pub mod config;
pub mod controller;
pub mod decision;
pub mod engine;
pub mod error;
pub mod intent_builder;
pub mod preferences;
pub mod simulator;
pub mod types;

pub use comparator::{compare_chains, Comparison};
pub use config::EngineConfig;
pub use controller::{
    ControllerHandle, ControllerSettings, QuoteEvent, QuoteResult, QuoteState, QuoteStatus,
    RefreshController,
};
pub use decision::{OptimizationPolicy, Savings};
pub use engine::OptimizationEngine;
pub use error::{OptimizationError, Result};
pub use intent_builder::BridgePlanBuilder;
pub use preferences::{InMemoryPreferencesStore, PreferencesStore};
pub use simulator::{ChainCostEvaluator, EvaluationInput};
pub use types::*;

/// Version of the decision engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
