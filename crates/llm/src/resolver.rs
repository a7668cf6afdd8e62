//! Model name to backend resolution.

use std::collections::BTreeMap;

use config::{BackendKind, LlmConfig};
use url::Url;

use crate::{error::ConfigurationError, messages::Model};

/// Where and how to reach a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDefinition {
    /// Name of the backend in the routing table, `ollama` for the implicit backend.
    pub name: String,
    /// Protocol spoken by the backend.
    pub kind: BackendKind,
    /// Base URL of the backend.
    pub location: Url,
}

#[derive(Debug)]
enum RoutingTable {
    /// No backends configured, everything goes to one Ollama server.
    Fallback { backend: BackendDefinition, model: String },
    Configured {
        default_backend: Option<String>,
        backends: BTreeMap<String, BackendDefinition>,
        routing: BTreeMap<String, String>,
        fallback_model: String,
    },
}

/// Resolves requested model names against an immutable routing table.
///
/// The table is built once from the configuration. Reconfiguring means building a new resolver.
#[derive(Debug)]
pub struct BackendResolver {
    table: RoutingTable,
}

impl BackendResolver {
    /// Build the routing table from configuration.
    pub fn new(config: &LlmConfig) -> Self {
        let table = if config.has_routing_table() {
            let backends = config
                .backends
                .iter()
                .map(|(name, backend)| {
                    let definition = BackendDefinition {
                        name: name.clone(),
                        kind: backend.kind.clone(),
                        location: backend.base_url.clone(),
                    };

                    (name.clone(), definition)
                })
                .collect();

            RoutingTable::Configured {
                default_backend: config.default_backend.clone(),
                backends,
                routing: config.routing.clone(),
                fallback_model: config.fallback_model.clone(),
            }
        } else {
            RoutingTable::Fallback {
                backend: BackendDefinition {
                    name: "ollama".to_string(),
                    kind: BackendKind::Ollama,
                    location: config.ollama_base_url.clone(),
                },
                model: config.fallback_model.clone(),
            }
        };

        Self { table }
    }

    /// Find the backend serving `model`.
    pub fn resolve(&self, model: &str) -> Result<&BackendDefinition, ConfigurationError> {
        let (default_backend, backends, routing) = match &self.table {
            RoutingTable::Fallback { backend, .. } => return Ok(backend),
            RoutingTable::Configured {
                default_backend,
                backends,
                routing,
                ..
            } => (default_backend, backends, routing),
        };

        let Some(key) = routing.get(model).or(default_backend.as_ref()) else {
            return Err(ConfigurationError::NoBackend(model.to_string()));
        };

        backends.get(key).ok_or_else(|| ConfigurationError::UnknownBackend {
            model: model.to_string(),
            backend: key.clone(),
        })
    }

    /// Every backend a request can resolve to.
    pub fn backends(&self) -> Vec<&BackendDefinition> {
        match &self.table {
            RoutingTable::Fallback { backend, .. } => vec![backend],
            RoutingTable::Configured { backends, .. } => backends.values().collect(),
        }
    }

    /// Models advertised to clients, ordered by name.
    ///
    /// With a default backend, the fallback model is advertised under it unless it has a route of
    /// its own.
    pub fn list_models(&self) -> Vec<Model> {
        match &self.table {
            RoutingTable::Fallback { backend, model } => vec![Model::new(model, &backend.name)],
            RoutingTable::Configured {
                default_backend,
                routing,
                fallback_model,
                ..
            } => {
                let mut models: BTreeMap<&str, &str> = routing
                    .iter()
                    .map(|(model, backend)| (model.as_str(), backend.as_str()))
                    .collect();

                if let Some(default_backend) = default_backend {
                    models.entry(fallback_model.as_str()).or_insert(default_backend.as_str());
                }

                models
                    .into_iter()
                    .map(|(model, backend)| Model::new(model, backend))
                    .collect()
            }
        }
    }
}
