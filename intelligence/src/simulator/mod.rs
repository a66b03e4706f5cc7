//! Cost simulation: USD cost formulas and per-chain evaluation

pub mod cost_model;
pub mod evaluator;

pub use evaluator::{ChainCostEvaluator, EvaluationInput};
