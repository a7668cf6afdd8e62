//! In-memory sliding window storage.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::window::SlidingWindow;

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Time to wait before retrying if not allowed.
    pub retry_after: Option<Duration>,
}

/// Per-client sliding windows kept in process memory.
///
/// Windows are created on first use and never evicted, so memory grows with the number of
/// distinct clients seen since startup.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    windows: DashMap<String, SlidingWindow>,
}

impl InMemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `key` may make a request at `now`, recording it if so.
    ///
    /// The entry lock on `key` is held across prune, check and record, so concurrent requests
    /// from the same client can never be admitted past `limit`.
    pub fn check_and_consume(&self, key: &str, now: Instant, limit: u32, duration: Duration) -> RateLimitResult {
        let mut window = self.windows.entry(key.to_string()).or_default();

        match window.try_admit(now, limit, duration) {
            Ok(()) => RateLimitResult {
                allowed: true,
                retry_after: None,
            },
            Err(retry_after) => {
                log::debug!("Quota of {limit} requests per {duration:?} exhausted, retry after {retry_after:?}");

                RateLimitResult {
                    allowed: false,
                    retry_after: Some(retry_after),
                }
            }
        }
    }

    /// Number of clients with a window in memory.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    /// Number of admissions currently recorded for `key`.
    pub fn recorded(&self, key: &str) -> usize {
        self.windows.get(key).map(|window| window.len()).unwrap_or_default()
    }
}
