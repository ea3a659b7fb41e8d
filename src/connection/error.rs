use std::time::Duration;
use thiserror::Error;

use crate::connection::retry::RetryError;
use crate::services::error::StoreError;

/// Errors surfaced by the connection transaction manager
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Empty or malformed ids; not retried
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Self-connection or a duplicate operation already in flight
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// Transient store failures that outlasted the retry budget
    #[error("Transient network error after {attempts} attempt(s): {source}")]
    TransientNetwork {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// Non-retryable store failure
    #[error("Persistence failure: {0}")]
    Persistence(#[source] StoreError),
}

impl ConnectionError {
    /// Message suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            ConnectionError::InvalidInput(msg) | ConnectionError::InvalidOperation(msg) => msg.clone(),
            ConnectionError::RateLimitExceeded { retry_after: Some(after) } => format!(
                "You're doing that too fast. Try again in {} seconds.",
                retry_after_secs(*after)
            ),
            ConnectionError::RateLimitExceeded { retry_after: None } => {
                "You're doing that too fast. Please slow down.".to_string()
            }
            ConnectionError::TransientNetwork { .. } | ConnectionError::Persistence(_) => {
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }

    /// Retry-after hint in whole seconds, rounded up
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ConnectionError::RateLimitExceeded { retry_after } => retry_after.map(retry_after_secs),
            _ => None,
        }
    }
}

fn retry_after_secs(after: Duration) -> u64 {
    let secs = after.as_secs();
    if after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl From<RetryError> for ConnectionError {
    fn from(err: RetryError) -> Self {
        if err.last.is_retryable() {
            ConnectionError::TransientNetwork {
                attempts: err.attempts,
                source: err.last,
            }
        } else {
            ConnectionError::Persistence(err.last)
        }
    }
}
