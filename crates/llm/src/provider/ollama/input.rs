use serde::Serialize;

use crate::messages::{ChatCompletionRequest, ChatMessage};

/// Request body for Ollama's `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub(super) struct OllamaChatRequest<'a> {
    pub(super) model: &'a str,
    pub(super) messages: &'a [ChatMessage],
    /// Ollama streams by default, so this is always sent.
    pub(super) stream: bool,
    pub(super) options: OllamaOptions,
}

/// Model parameters, Ollama's home for sampling settings.
#[derive(Debug, Serialize)]
pub(super) struct OllamaOptions {
    pub(super) temperature: f32,
}

impl<'a> OllamaChatRequest<'a> {
    pub(super) fn new(request: &'a ChatCompletionRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
            },
        }
    }
}
