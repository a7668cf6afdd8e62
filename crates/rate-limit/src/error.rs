//! Error types for rate limiting.

use std::time::Duration;

/// Errors that can occur during rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// The client exceeded its request quota.
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    LimitExceeded {
        /// Time until the oldest admission in the window expires.
        retry_after: Duration,
    },
}

impl RateLimitError {
    /// Get the retry-after duration.
    pub fn retry_after(&self) -> Duration {
        match self {
            Self::LimitExceeded { retry_after } => *retry_after,
        }
    }
}
