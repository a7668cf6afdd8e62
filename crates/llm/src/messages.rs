//! OpenAI-compatible wire types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
}

/// Chat message in OpenAI format.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

/// OpenAI-compatible chat completion request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    /// Requested model, used for backend resolution.
    pub model: String,
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Whether the response is sent as server-sent events.
    #[serde(default)]
    pub stream: bool,
    /// Other OpenAI parameters, such as `max_tokens`. Forwarded as received to compatible
    /// backends.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_temperature() -> f32 {
    1.0
}

/// OpenAI-compatible chat completion response.
///
/// Fields outside the OpenAI shape are kept in `extra` so a compatible backend's body is relayed
/// without loss.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    /// Completion identifier.
    pub id: String,
    /// Always `chat.completion` for responses produced by the gateway.
    pub object: String,
    /// Creation time in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    /// Model that produced the completion.
    pub model: String,
    /// Completion choices.
    pub choices: Vec<ChatChoice>,
    /// Token accounting.
    pub usage: Usage,
    /// Unknown fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Chat completion choice.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoice {
    /// Position of the choice.
    pub index: u32,
    /// The generated message.
    pub message: ChatMessage,
    /// Why generation stopped.
    pub finish_reason: String,
    /// Unknown fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Sum of prompt and completion tokens.
    pub total_tokens: u32,
}

/// One increment of a streamed chat completion.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    /// Identifier shared by every chunk of one stream.
    pub id: String,
    /// Always `chat.completion.chunk`.
    pub object: &'static str,
    /// Creation time in seconds since the Unix epoch.
    pub created: u64,
    /// Model producing the stream.
    pub model: String,
    /// Chunk choices, a single one at index 0.
    pub choices: Vec<ChunkChoice>,
}

/// Choice of a streamed chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice {
    /// Position of the choice.
    pub index: u32,
    /// Message fields known so far.
    pub delta: ChatDelta,
    /// Set on the final chunk only.
    pub finish_reason: Option<String>,
}

/// Partial message of a streamed chunk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatDelta {
    /// Role, when the backend sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Content increment, when the backend sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Model information.
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    /// Model name clients put in requests.
    pub id: String,
    /// Always `model`.
    pub object: &'static str,
    /// Creation time, unknown for routed models.
    pub created: u64,
    /// Name of the backend serving the model.
    pub owned_by: String,
}

impl Model {
    pub(crate) fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model",
            created: 0,
            owned_by: owned_by.into(),
        }
    }
}

/// Models list response.
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    /// Always `list`.
    pub object: &'static str,
    /// Available models.
    pub data: Vec<Model>,
}

impl From<Vec<Model>> for ModelsResponse {
    fn from(data: Vec<Model>) -> Self {
        Self { object: "list", data }
    }
}
