//! Prometheus metrics endpoint configuration.

use std::borrow::Cow;

use serde::Deserialize;

/// Request metrics and the Prometheus scrape endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether request metrics are recorded and exposed.
    pub enabled: bool,
    /// The path of the scrape endpoint.
    pub path: Cow<'static, str>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            enabled: true,
            path: Cow::Borrowed("/metrics"),
        }
    }
}
