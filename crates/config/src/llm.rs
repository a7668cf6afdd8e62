//! Backend routing configuration for the chat completion endpoints.

use std::{borrow::Cow, collections::BTreeMap, fmt, time::Duration};

use duration_str::deserialize_duration;
use serde::Deserialize;
use url::Url;

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Routing table and backend settings for the OpenAI-compatible endpoints.
///
/// When no backends, routes or default backend are defined, every model is served by a single
/// implicit Ollama backend at `ollama_base_url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// The path where the OpenAI-compatible endpoints are mounted. `/` mounts them at the root.
    pub path: Cow<'static, str>,
    /// Base URL of the implicit Ollama backend used when no routing table is configured.
    pub ollama_base_url: Url,
    /// Model advertised by the models endpoint when no routing table is configured.
    pub fallback_model: String,
    /// Backend used for models without an explicit route.
    pub default_backend: Option<String>,
    /// Timeouts for backend calls.
    pub timeouts: TimeoutsConfig,
    /// Backend definitions keyed by name.
    pub backends: BTreeMap<String, BackendConfig>,
    /// Model name to backend name.
    pub routing: BTreeMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            path: Cow::Borrowed("/"),
            ollama_base_url: Url::parse(DEFAULT_OLLAMA_BASE_URL).expect("default Ollama URL is valid"),
            fallback_model: "llama3".to_string(),
            default_backend: None,
            timeouts: TimeoutsConfig::default(),
            backends: BTreeMap::new(),
            routing: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    /// Whether an explicit routing table is configured.
    ///
    /// Any backend, route or default backend counts. Only a config with none of them runs in
    /// zero-config mode.
    pub fn has_routing_table(&self) -> bool {
        !self.backends.is_empty() || !self.routing.is_empty() || self.default_backend.is_some()
    }
}

/// Timeouts applied to backend calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    /// Total time allowed for a non-streaming backend call.
    #[serde(deserialize_with = "deserialize_duration")]
    pub request: Duration,
    /// Time allowed to establish a backend connection, streaming or not.
    #[serde(deserialize_with = "deserialize_duration")]
    pub connect: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(60),
            connect: Duration::from_secs(10),
        }
    }
}

/// A single backend definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// The protocol spoken by the backend.
    #[serde(rename = "type")]
    pub kind: BackendKind,
    /// Base URL of the backend.
    pub base_url: Url,
}

/// Backend protocol.
///
/// Unknown protocol names deserialize into [`BackendKind::Unsupported`] so that a single
/// misconfigured backend is reported when it is routed to, not when the file is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BackendKind {
    /// Ollama's native chat protocol.
    Ollama,
    /// An OpenAI-compatible HTTP server.
    Http,
    /// Anything else.
    Unsupported(String),
}

impl From<String> for BackendKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ollama" => Self::Ollama,
            "http" => Self::Http,
            _ => Self::Unsupported(value),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => f.write_str("ollama"),
            Self::Http => f.write_str("http"),
            Self::Unsupported(name) => f.write_str(name),
        }
    }
}
