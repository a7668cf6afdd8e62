use std::{collections::BTreeMap, sync::Arc};

use config::{BackendKind, LlmConfig};

use crate::{
    error::GatewayError,
    messages::{ChatCompletionRequest, ChatCompletionResponse, ModelsResponse},
    pool::ConnectionPool,
    provider::{ChatCompletionStream, Provider, http::HttpProvider, ollama::OllamaProvider},
    resolver::BackendResolver,
};

/// Outcome of a dispatched request.
pub enum Dispatch {
    /// The complete response of a non-streaming request.
    Completion(ChatCompletionResponse),
    /// The chunk stream of a streaming request.
    Stream(ChatCompletionStream),
}

/// Routes chat completion requests to their backend adapter.
///
/// Makes exactly one backend call per request and never retries.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<DispatcherInner>,
}

struct DispatcherInner {
    resolver: BackendResolver,
    /// Adapters by backend name. Backends of an unsupported type have none.
    providers: BTreeMap<String, Box<dyn Provider>>,
}

impl Dispatcher {
    /// Build the routing table and one adapter per supported backend, sharing `pool`.
    pub fn new(config: &LlmConfig, pool: Arc<ConnectionPool>) -> Self {
        let resolver = BackendResolver::new(config);
        let mut providers = BTreeMap::new();

        for backend in resolver.backends() {
            let provider: Box<dyn Provider> = match &backend.kind {
                BackendKind::Ollama => Box::new(OllamaProvider::new(&backend.name, &backend.location, pool.clone())),
                BackendKind::Http => Box::new(HttpProvider::new(&backend.name, &backend.location, pool.clone())),
                BackendKind::Unsupported(kind) => {
                    log::debug!("Skipping backend '{}' of unsupported type '{kind}'", backend.name);
                    continue;
                }
            };

            log::debug!("Initialized {} backend '{}' at {}", backend.kind, backend.name, backend.location);
            providers.insert(backend.name.clone(), provider);
        }

        Self {
            shared: Arc::new(DispatcherInner { resolver, providers }),
        }
    }

    /// Resolve the backend for the requested model and forward the request to it.
    pub async fn dispatch(&self, request: ChatCompletionRequest) -> Result<Dispatch, GatewayError> {
        if request.messages.is_empty() {
            return Err(GatewayError::InvalidRequest("messages must not be empty".to_string()));
        }

        let backend = self.shared.resolver.resolve(&request.model)?;

        let Some(provider) = self.shared.providers.get(&backend.name) else {
            return Err(GatewayError::UnsupportedBackend(backend.kind.to_string()));
        };

        log::debug!(
            "Dispatching model '{}' to backend '{}' (stream: {})",
            request.model,
            provider.name(),
            request.stream
        );

        if request.stream {
            let stream = provider.chat_completion_stream(request).await?;
            Ok(Dispatch::Stream(stream))
        } else {
            let response = provider.chat_completion(request).await?;
            Ok(Dispatch::Completion(response))
        }
    }

    /// Models advertised by the models endpoint.
    pub fn list_models(&self) -> ModelsResponse {
        ModelsResponse::from(self.shared.resolver.list_models())
    }
}
