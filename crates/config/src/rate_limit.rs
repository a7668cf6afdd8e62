//! Rate limiting configuration structures.

use std::{str::FromStr, time::Duration};

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Configuration for a sliding window rate limit quota.
///
/// Deserializes either from a table (`{ limit = 100, duration = "1m" }`) or from the
/// `"<count>/<window>"` shorthand, e.g. `"2/5"`, `"2/5s"`, `"100/minute"` or `"1000/1h"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawQuota")]
pub struct RateLimitQuota {
    /// Maximum number of requests admitted within the window. Zero disables limiting.
    pub limit: u32,
    /// Length of the sliding window.
    pub duration: Duration,
}

impl RateLimitQuota {
    /// Whether this quota admits a finite number of requests.
    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }
}

/// Errors when parsing a rate limit quota.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitQuotaError {
    /// The shorthand has no `/` separating count and window.
    #[error("rate limit '{0}' must have the form '<count>/<window>', e.g. '100/minute'")]
    MissingSeparator(String),
    /// The count is not a non-negative integer.
    #[error("invalid request count '{0}' in rate limit")]
    InvalidCount(String),
    /// The window could not be parsed as seconds, a unit or a duration.
    #[error("invalid rate limit window '{window}': {reason}")]
    InvalidWindow {
        /// The offending window text.
        window: String,
        /// Why parsing failed.
        reason: String,
    },
    /// The window is zero seconds long.
    #[error("rate limit window must be longer than zero")]
    ZeroWindow,
}

impl FromStr for RateLimitQuota {
    type Err = RateLimitQuotaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((count, window)) = s.split_once('/') else {
            return Err(RateLimitQuotaError::MissingSeparator(s.to_string()));
        };

        let limit = count
            .trim()
            .parse::<u32>()
            .map_err(|_| RateLimitQuotaError::InvalidCount(count.trim().to_string()))?;

        let duration = parse_window(window.trim())?;

        if duration.is_zero() {
            return Err(RateLimitQuotaError::ZeroWindow);
        }

        Ok(Self { limit, duration })
    }
}

fn parse_window(window: &str) -> Result<Duration, RateLimitQuotaError> {
    if let Ok(seconds) = window.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let unit = match window.to_ascii_lowercase().as_str() {
        "s" | "sec" | "second" | "seconds" => Some(1),
        "m" | "min" | "minute" | "minutes" => Some(60),
        "h" | "hour" | "hours" => Some(3600),
        _ => None,
    };

    if let Some(seconds) = unit {
        return Ok(Duration::from_secs(seconds));
    }

    duration_str::parse(window).map_err(|e| RateLimitQuotaError::InvalidWindow {
        window: window.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuota {
    Shorthand(String),
    Table(QuotaTable),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct QuotaTable {
    limit: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    duration: Duration,
}

impl TryFrom<RawQuota> for RateLimitQuota {
    type Error = RateLimitQuotaError;

    fn try_from(raw: RawQuota) -> Result<Self, Self::Error> {
        match raw {
            RawQuota::Shorthand(s) => s.parse(),
            RawQuota::Table(QuotaTable { duration, .. }) if duration.is_zero() => Err(RateLimitQuotaError::ZeroWindow),
            RawQuota::Table(QuotaTable { limit, duration }) => Ok(Self { limit, duration }),
        }
    }
}
