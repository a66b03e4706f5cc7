//! Retry and timeout helpers for market data fetches

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::{DataplaneError, Result};

/// Retry configuration for operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry a future with exponential backoff
///
/// Only errors reporting `is_retryable()` are retried; anything else is
/// returned on the first attempt.
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 1;

    loop {
        debug!(
            operation = operation_name,
            attempt = attempt,
            max_attempts = max_attempts,
            "Attempting operation"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Operation failed, retrying"
                );

                sleep(delay).await;
                delay = std::cmp::min(delay.mul_f64(config.backoff_multiplier), config.max_delay);
                attempt += 1;
            }
            Err(error) => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %error,
                    "Operation failed"
                );
                return Err(error);
            }
        }
    }
}

/// Execute an operation with a timeout
pub async fn with_timeout<F, T>(
    future: F,
    timeout_duration: Duration,
    operation_name: &str,
) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match timeout(timeout_duration, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms = timeout_duration.as_millis() as u64,
                "Operation timed out"
            );
            Err(DataplaneError::Timeout {
                operation: operation_name.to_string(),
                timeout_ms: timeout_duration.as_millis() as u64,
            })
        }
    }
}

/// Convert a Unix timestamp (seconds) to a DateTime<Utc>
pub fn timestamp_to_datetime(timestamp: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_else(Utc::now)
}
