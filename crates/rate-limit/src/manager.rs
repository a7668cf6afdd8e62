//! Rate limit manager implementation.

use std::sync::Arc;

use config::RateLimitQuota;
use tokio::time::Instant;

use crate::{error::RateLimitError, storage::InMemoryStorage};

/// Admits or rejects requests per client identity.
///
/// Cloning is cheap and clones share the same windows.
#[derive(Clone)]
pub struct RateLimitManager {
    /// The active quota, `None` when limiting is disabled.
    quota: Option<RateLimitQuota>,
    storage: Arc<InMemoryStorage>,
}

impl RateLimitManager {
    /// Create a manager enforcing `quota`. A missing quota or a zero limit admits everything.
    pub fn new(quota: Option<&RateLimitQuota>) -> Self {
        let quota = quota.filter(|quota| quota.is_enabled()).cloned();

        if let Some(quota) = &quota {
            log::debug!(
                "Rate limiting enabled: {} requests per {:?} per client",
                quota.limit,
                quota.duration
            );
        }

        Self {
            quota,
            storage: Arc::new(InMemoryStorage::new()),
        }
    }

    /// Whether any request can be rejected.
    pub fn is_enabled(&self) -> bool {
        self.quota.is_some()
    }

    /// Check and record a request from `key` at the current time.
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_at(key, Instant::now())
    }

    /// Check and record a request from `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let Some(quota) = &self.quota else {
            return Ok(());
        };

        let result = self.storage.check_and_consume(key, now, quota.limit, quota.duration);

        if !result.allowed {
            return Err(RateLimitError::LimitExceeded {
                retry_after: result.retry_after.unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// The underlying storage.
    pub fn storage(&self) -> &InMemoryStorage {
        &self.storage
    }
}
