//! HTTP server configuration settings.

use std::net::SocketAddr;

use secrecy::SecretString;
use serde::Deserialize;

use crate::{HealthConfig, MetricsConfig, RateLimitQuota};

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// Health endpoint configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// Request metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// API key authentication.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Per-client sliding window rate limit. Absent or a zero limit disables limiting.
    #[serde(default)]
    pub rate_limit: Option<RateLimitQuota>,
}

impl ServerConfig {
    /// The rate limit quota, if limiting is active.
    pub fn active_rate_limit(&self) -> Option<&RateLimitQuota> {
        self.rate_limit.as_ref().filter(|quota| quota.is_enabled())
    }
}

/// API key authentication settings.
#[derive(Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Keys accepted in `Authorization: Bearer` or `X-API-Key`. Empty disables authentication.
    pub api_keys: Vec<SecretString>,
}

impl AuthConfig {
    /// Whether requests must present a valid API key.
    pub fn enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys are never printed, only how many are configured.
        f.debug_struct("AuthConfig")
            .field("api_keys", &vec!["[REDACTED]"; self.api_keys.len()])
            .finish()
    }
}
