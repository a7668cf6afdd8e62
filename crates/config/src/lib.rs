//! GenAI router configuration structures to map the genai-router.toml configuration.

#![deny(missing_docs)]

mod health;
mod llm;
mod loader;
mod metrics;
mod rate_limit;
mod server;

use std::path::Path;

pub use health::HealthConfig;
pub use llm::{BackendConfig, BackendKind, LlmConfig, TimeoutsConfig};
pub use metrics::MetricsConfig;
pub use rate_limit::{RateLimitQuota, RateLimitQuotaError};
pub use server::{AuthConfig, ServerConfig};
use serde::Deserialize;

/// Main configuration structure for the router.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Backend routing configuration.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates the routing table, returning human readable warnings for suspicious entries.
    pub fn validate(&self) -> Vec<String> {
        loader::validate_routing(&self.llm)
    }
}
