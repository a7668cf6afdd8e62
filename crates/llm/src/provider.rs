pub(crate) mod http;
pub(crate) mod ollama;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use reqwest::Response;
use url::Url;

use crate::{
    error::BackendError,
    messages::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse},
};

/// One server-sent event produced by a backend adapter.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A chunk converted into OpenAI shape.
    Chunk(ChatCompletionChunk),
    /// A payload relayed without conversion.
    Data(String),
}

impl StreamEvent {
    /// The `data:` payload of the event.
    pub fn into_data(self) -> String {
        match self {
            Self::Data(data) => data,
            Self::Chunk(chunk) => sonic_rs::to_string(&chunk).unwrap_or_else(|e| {
                log::error!("Failed to serialize chunk: {e}");
                r#"{"error":"serialization failed"}"#.to_string()
            }),
        }
    }
}

/// Type alias for a stream of chat completion events.
///
/// The stream owns the backend response. Dropping it closes the backend connection.
pub type ChatCompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, BackendError>> + Send>>;

/// A backend protocol adapter.
///
/// Note for async_trait: We need this trait to be dyn-compatible, so we can't just use the
/// Rust async trait functions without Box/Pin.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    /// Process a chat completion request.
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, BackendError>;

    /// Process a streaming chat completion request.
    ///
    /// Fails before producing any event if the backend rejects the call.
    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> Result<ChatCompletionStream, BackendError>;

    /// Get the provider name.
    fn name(&self) -> &str;
}

/// Join an endpoint path onto a backend base URL, keeping any path prefix of the base.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> String {
    format!("{}/{path}", base_url.as_str().trim_end_matches('/'))
}

/// Turn an error status into a [`BackendError`] carrying the response body.
pub(crate) async fn check_status(response: Response, provider: &str) -> Result<Response, BackendError> {
    let status = response.status();

    if !status.is_client_error() && !status.is_server_error() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    log::error!("{provider} backend error ({status}): {body}");

    Err(BackendError::status(status.as_u16(), &body))
}
