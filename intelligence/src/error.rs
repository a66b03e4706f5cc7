//! Error types for the decision engine

use gasroute_dataplane::Chain;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, OptimizationError>;

/// Errors surfaced by an evaluation or by the engine's plumbing
///
/// Per-chain data problems are not errors; they become `PartialDataWarning`s
/// on the quote. Only the origin chain's data (the savings baseline) is fatal.
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing market data for {chain}: {message}")]
    MissingMarketData { chain: Chain, message: String },

    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Stale result discarded: generation {generation} superseded by {latest}")]
    StaleResultDiscarded { generation: u64, latest: u64 },

    #[error("Refresh controller is no longer running")]
    ControllerClosed,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataplane error: {0}")]
    Dataplane(#[from] gasroute_dataplane::DataplaneError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OptimizationError {
    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a missing market data error
    pub fn missing_market_data<S: Into<String>>(chain: Chain, message: S) -> Self {
        Self::MissingMarketData {
            chain,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Taxonomy name reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizationError::InvalidInput(_) => "InvalidInputError",
            OptimizationError::MissingMarketData { .. } => "MissingMarketDataError",
            OptimizationError::Timeout { .. } => "TimeoutError",
            OptimizationError::StaleResultDiscarded { .. } => "StaleResultDiscarded",
            OptimizationError::ControllerClosed => "ControllerClosed",
            OptimizationError::Config(_) => "ConfigError",
            OptimizationError::Serialization(_) | OptimizationError::Yaml(_) => {
                "SerializationError"
            }
            OptimizationError::Io(_) => "IoError",
            OptimizationError::Dataplane(_) => "DataplaneError",
            OptimizationError::Internal(_) => "InternalError",
        }
    }

    /// Check if retrying with fresh market data may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            OptimizationError::MissingMarketData { .. } | OptimizationError::Timeout { .. } => true,
            OptimizationError::Dataplane(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_retry_policy() {
        let invalid = OptimizationError::invalid_input("amountIn must be positive");
        assert_eq!(invalid.kind(), "InvalidInputError");
        assert!(!invalid.is_retryable());

        let missing = OptimizationError::missing_market_data(Chain::Ethereum, "no gas price");
        assert_eq!(missing.kind(), "MissingMarketDataError");
        assert!(missing.is_retryable());
        assert_eq!(
            missing.to_string(),
            "Missing market data for Ethereum: no gas price"
        );
    }
}
