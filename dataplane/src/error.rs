//! Error types for the dataplane module

use thiserror::Error;

/// Result type alias for dataplane operations
pub type Result<T> = std::result::Result<T, DataplaneError>;

/// Error types for market data supply
#[derive(Error, Debug)]
pub enum DataplaneError {
    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    #[error("Market data not found: {0}")]
    NotFound(String),

    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed error: {message}")]
    Feed { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataplaneError {
    /// Create a not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a new feed error
    pub fn feed<S: Into<String>>(message: S) -> Self {
        Self::Feed {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataplaneError::Network(_) | DataplaneError::Timeout { .. }
        )
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            DataplaneError::InvalidChain(_) => "validation",
            DataplaneError::NotFound(_) => "not_found",
            DataplaneError::Timeout { .. } => "timeout",
            DataplaneError::Network(_) => "network",
            DataplaneError::Url(_) => "config",
            DataplaneError::Serialization(_) => "serialization",
            DataplaneError::Io(_) => "io",
            DataplaneError::Feed { .. } => "feed",
            DataplaneError::Internal(_) => "internal",
        }
    }
}
