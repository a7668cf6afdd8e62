//! OpenAI-compatible chat completion endpoints backed by Ollama or OpenAI-compatible servers.

use axum::{
    Router,
    extract::{Json, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use config::LlmConfig;

mod dispatcher;
mod error;
mod messages;
mod pool;
mod provider;
mod resolver;
mod sse;

pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{BackendError, ConfigurationError, GatewayError};
pub use messages::{
    ChatChoice, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatDelta, ChatMessage,
    ChunkChoice, Model, ModelsResponse, Role, Usage,
};
pub use pool::ConnectionPool;
pub use provider::{ChatCompletionStream, StreamEvent};
pub use resolver::{BackendDefinition, BackendResolver};

/// Creates an axum router for the chat completion and model listing endpoints.
///
/// The routes are mounted under `config.path`. Every adapter shares `pool`, which the caller
/// closes on shutdown.
pub fn router(config: &LlmConfig, pool: std::sync::Arc<ConnectionPool>) -> Router {
    let dispatcher = Dispatcher::new(config, pool);

    let ai_routes = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .with_state(dispatcher);

    // axum refuses to nest at the root.
    match config.path.trim_end_matches('/') {
        "" => ai_routes,
        path => Router::new().nest(path, ai_routes),
    }
}

/// Handle chat completion requests.
///
/// This endpoint supports both streaming and non-streaming responses.
/// When `stream: true` is set in the request, the response is sent as
/// Server-Sent Events (SSE). Otherwise, a standard JSON response is returned.
async fn chat_completions(
    State(dispatcher): State<Dispatcher>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, GatewayError> {
    log::debug!(
        "Chat completion requested for model '{}' with {} message(s)",
        request.model,
        request.messages.len()
    );

    match dispatcher.dispatch(request).await? {
        Dispatch::Stream(stream) => {
            log::debug!("Returning streaming response");
            Ok(sse::events_to_sse(stream).into_response())
        }
        Dispatch::Completion(response) => {
            log::debug!(
                "Chat completion successful, returning response with {} choices",
                response.choices.len()
            );

            Ok(Json(response).into_response())
        }
    }
}

/// Handle list models requests.
async fn list_models(State(dispatcher): State<Dispatcher>) -> Json<ModelsResponse> {
    let response = dispatcher.list_models();

    log::debug!("Returning {} models", response.data.len());
    Json(response)
}
