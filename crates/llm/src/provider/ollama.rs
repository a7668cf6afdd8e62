mod input;
mod output;

use std::{pin::pin, sync::Arc};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Response, header::CONTENT_TYPE};
use url::Url;

use self::{
    input::OllamaChatRequest,
    output::{OllamaChatResponse, completion_id},
};

use crate::{
    error::BackendError,
    messages::{ChatCompletionRequest, ChatCompletionResponse},
    pool::ConnectionPool,
    provider::{ChatCompletionStream, Provider, StreamEvent, check_status, endpoint},
    sse::parser::lines,
};

/// Adapter for Ollama's native `/api/chat` protocol.
pub(crate) struct OllamaProvider {
    pool: Arc<ConnectionPool>,
    chat_url: String,
    name: String,
}

impl OllamaProvider {
    pub fn new(name: &str, base_url: &Url, pool: Arc<ConnectionPool>) -> Self {
        Self {
            pool,
            chat_url: endpoint(base_url, "api/chat"),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, BackendError> {
        let client = self.pool.client()?;

        let response = client
            .post(&self.chat_url)
            .timeout(self.pool.request_timeout())
            .json(&OllamaChatRequest::new(&request, false))
            .send()
            .await?;

        let response = check_status(response, &self.name).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        let message = if is_json {
            let text = response.text().await?;

            sonic_rs::from_str::<OllamaChatResponse>(&text).map_err(|e| {
                log::error!("Failed to parse Ollama chat response: {e}");
                log::error!("Raw response that failed to parse: {text}");
                BackendError::new(format!("Invalid response from Ollama: {e}"))
            })?
        } else {
            // Ollama may stream even when asked not to.
            log::debug!("Ollama streamed a non-streaming request, keeping the last message");
            last_message(response).await?
        };

        if let Some(error) = message.error {
            return Err(BackendError::new(format!("Ollama error: {error}")));
        }

        Ok(message.into_response(&request.model))
    }

    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> Result<ChatCompletionStream, BackendError> {
        let client = self.pool.client()?;

        // No response timeout, a generation may run for as long as the model needs.
        let response = client
            .post(&self.chat_url)
            .json(&OllamaChatRequest::new(&request, true))
            .send()
            .await?;

        let response = check_status(response, &self.name).await?;

        let id = completion_id();
        let model = request.model;

        let stream = lines(response.bytes_stream()).map(move |line| {
            let line = line?;

            let event = match sonic_rs::from_str::<OllamaChatResponse>(&line) {
                Ok(message) if message.error.is_none() => StreamEvent::Chunk(message.into_chunk(&id, &model)),
                Ok(_) => {
                    log::warn!("Ollama reported an error mid-stream: {line}");
                    StreamEvent::Data(line)
                }
                Err(e) => {
                    log::warn!("Forwarding malformed Ollama stream line as is: {e}");
                    StreamEvent::Data(line)
                }
            };

            Ok(event)
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read a newline-delimited stream to the end and keep the last line that parses.
async fn last_message(response: Response) -> Result<OllamaChatResponse, BackendError> {
    let mut lines = pin!(lines(response.bytes_stream()));
    let mut last = None;

    while let Some(line) = lines.next().await {
        match sonic_rs::from_str::<OllamaChatResponse>(&line?) {
            Ok(message) => last = Some(message),
            Err(e) => log::debug!("Skipping malformed Ollama line: {e}"),
        }
    }

    last.ok_or_else(|| BackendError::new("Ollama returned empty streaming response"))
}
