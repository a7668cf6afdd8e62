use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use url::Url;

use crate::{
    error::BackendError,
    messages::{ChatCompletionRequest, ChatCompletionResponse},
    pool::ConnectionPool,
    provider::{ChatCompletionStream, Provider, StreamEvent, check_status, endpoint},
    sse::parser::lines,
};

/// Adapter for servers that already speak the OpenAI protocol.
///
/// Requests are forwarded as they came in and responses are relayed without conversion.
pub(crate) struct HttpProvider {
    pool: Arc<ConnectionPool>,
    completions_url: String,
    name: String,
}

impl HttpProvider {
    pub fn new(name: &str, base_url: &Url, pool: Arc<ConnectionPool>) -> Self {
        Self {
            pool,
            completions_url: endpoint(base_url, "v1/chat/completions"),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, BackendError> {
        let client = self.pool.client()?;

        let response = client
            .post(&self.completions_url)
            .timeout(self.pool.request_timeout())
            .json(&request)
            .send()
            .await?;

        let response = check_status(response, &self.name).await?;
        let text = response.text().await?;

        sonic_rs::from_str(&text).map_err(|e| {
            log::error!("Backend '{}' returned an invalid chat completion: {e}", self.name);
            log::error!("Raw response that failed to parse: {text}");
            BackendError::new(format!("Invalid response from backend '{}': {e}", self.name))
        })
    }

    async fn chat_completion_stream(&self, request: ChatCompletionRequest) -> Result<ChatCompletionStream, BackendError> {
        let client = self.pool.client()?;

        let response = client.post(&self.completions_url).json(&request).send().await?;
        let response = check_status(response, &self.name).await?;

        let stream = lines(response.bytes_stream()).map(|line| Ok(StreamEvent::Data(sse_payload(&line?))));

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The payload of a relayed line.
///
/// Lines framed as `data:` lose the prefix, which the response framing adds back. Anything else
/// is relayed as the payload itself.
fn sse_payload(line: &str) -> String {
    match line.strip_prefix("data:") {
        Some(data) => data.strip_prefix(' ').unwrap_or(data).to_string(),
        None => line.to_string(),
    }
}
