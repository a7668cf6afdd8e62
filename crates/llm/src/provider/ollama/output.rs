use std::collections::BTreeMap;

use serde::Deserialize;

use crate::messages::{
    ChatChoice, ChatCompletionChunk, ChatCompletionResponse, ChatDelta, ChatMessage, ChunkChoice, Role, Usage,
};

/// One object returned by Ollama's `/api/chat`: the whole answer, or one line of a stream.
///
/// Every field is optional because Ollama omits most of them on intermediate stream lines.
#[derive(Debug, Default, Deserialize)]
pub(super) struct OllamaChatResponse {
    pub(super) id: Option<String>,
    pub(super) model: Option<String>,
    /// RFC 3339 timestamp.
    pub(super) created_at: Option<String>,
    pub(super) message: Option<OllamaMessage>,
    #[serde(default)]
    pub(super) done: bool,
    pub(super) done_reason: Option<String>,
    pub(super) prompt_eval_count: Option<u32>,
    pub(super) eval_count: Option<u32>,
    /// Takes precedence over the eval counts when present.
    pub(super) usage: Option<Usage>,
    /// Set instead of a message when generation fails.
    pub(super) error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct OllamaMessage {
    pub(super) role: Option<String>,
    pub(super) content: Option<String>,
}

impl OllamaMessage {
    fn role(&self) -> Option<Role> {
        match self.role.as_deref()? {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl OllamaChatResponse {
    /// Convert the final message into a complete OpenAI response.
    pub(super) fn into_response(self, requested_model: &str) -> ChatCompletionResponse {
        let created = created(self.created_at.as_deref());
        let message = self.message.unwrap_or_default();

        let usage = self.usage.unwrap_or_else(|| {
            let prompt_tokens = self.prompt_eval_count.unwrap_or_default();
            let completion_tokens = self.eval_count.unwrap_or_default();

            Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens.saturating_add(completion_tokens),
            }
        });

        ChatCompletionResponse {
            id: self.id.unwrap_or_else(completion_id),
            object: "chat.completion".to_string(),
            created: Some(created),
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: message.role().unwrap_or(Role::Assistant),
                    content: message.content.unwrap_or_default(),
                },
                finish_reason: self.done_reason.unwrap_or_else(|| "stop".to_string()),
                extra: BTreeMap::new(),
            }],
            usage,
            extra: BTreeMap::new(),
        }
    }

    /// Convert one stream line into an OpenAI chunk.
    ///
    /// The delta only carries the fields Ollama sent. The finish reason is set on the line
    /// marked `done` and nowhere else.
    pub(super) fn into_chunk(self, id: &str, requested_model: &str) -> ChatCompletionChunk {
        let delta = match &self.message {
            Some(message) => ChatDelta {
                role: message.role(),
                content: message.content.clone(),
            },
            None => ChatDelta::default(),
        };

        let finish_reason = if self.done {
            Some(self.done_reason.unwrap_or_else(|| "stop".to_string()))
        } else {
            None
        };

        ChatCompletionChunk {
            id: id.to_string(),
            object: "chat.completion.chunk",
            created: created(self.created_at.as_deref()),
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

/// A fresh synthetic completion id.
pub(super) fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4())
}

fn created(created_at: Option<&str>) -> u64 {
    let timestamp = created_at
        .and_then(|value| match value.parse::<jiff::Timestamp>() {
            Ok(timestamp) => Some(timestamp),
            Err(e) => {
                log::debug!("Ignoring unparseable Ollama timestamp '{value}': {e}");
                None
            }
        })
        .unwrap_or_else(jiff::Timestamp::now);

    u64::try_from(timestamp.as_second()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;

    use super::*;

    fn parse(json: &str) -> OllamaChatResponse {
        sonic_rs::from_str(json).unwrap()
    }

    #[test]
    fn final_message_to_response() {
        let message = parse(
            r#"{"message":{"role":"assistant","content":"hi"},"done":true,"done_reason":"stop","prompt_eval_count":3,"eval_count":2}"#,
        );

        let mut response = message.into_response("llama3");
        assert!(response.id.starts_with("chatcmpl-"));

        response.id = "chatcmpl-test".to_string();
        response.created = Some(0);

        assert_json_snapshot!(response, @r#"
        {
          "id": "chatcmpl-test",
          "object": "chat.completion",
          "created": 0,
          "model": "llama3",
          "choices": [
            {
              "index": 0,
              "message": {
                "role": "assistant",
                "content": "hi"
              },
              "finish_reason": "stop"
            }
          ],
          "usage": {
            "prompt_tokens": 3,
            "completion_tokens": 2,
            "total_tokens": 5
          }
        }
        "#);
    }

    #[test]
    fn backend_fields_win() {
        let message = parse(
            r#"{"id":"abc","model":"llama3:8b","created_at":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":"hi"},"done":true,"done_reason":"length","prompt_eval_count":3,"eval_count":2,"usage":{"prompt_tokens":10,"completion_tokens":20,"total_tokens":30}}"#,
        );

        let response = message.into_response("llama3");

        assert_eq!(response.id, "abc");
        assert_eq!(response.model, "llama3:8b");
        assert_eq!(response.created, Some(1704067200));
        assert_eq!(response.choices[0].finish_reason, "length");
        assert_eq!(
            response.usage,
            Usage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30
            }
        );
    }

    #[test]
    fn missing_counts_are_zero() {
        let response = parse(r#"{"message":{"role":"assistant","content":"hi"},"done":true}"#).into_response("llama3");

        assert_eq!(response.choices[0].finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn intermediate_line_to_chunk() {
        let line = parse(r#"{"model":"llama3","created_at":"2024-01-01T00:00:00Z","message":{"content":"h"},"done":false}"#);

        assert_json_snapshot!(line.into_chunk("chatcmpl-1", "llama3"), @r#"
        {
          "id": "chatcmpl-1",
          "object": "chat.completion.chunk",
          "created": 1704067200,
          "model": "llama3",
          "choices": [
            {
              "index": 0,
              "delta": {
                "content": "h"
              },
              "finish_reason": null
            }
          ]
        }
        "#);
    }

    #[test]
    fn done_reason_only_on_final_line() {
        let line = parse(r#"{"message":{"role":"assistant","content":"i"},"done":false,"done_reason":"stop"}"#);
        let chunk = line.into_chunk("chatcmpl-1", "llama3");

        assert_eq!(chunk.choices[0].finish_reason, None);
        assert_eq!(chunk.choices[0].delta.role, Some(Role::Assistant));

        let line = parse(r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#);
        let chunk = line.into_chunk("chatcmpl-1", "llama3");

        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn final_line_without_message() {
        let chunk = parse(r#"{"done":true}"#).into_chunk("chatcmpl-1", "llama3");

        assert_json_snapshot!(chunk.choices, @r#"
        [
          {
            "index": 0,
            "delta": {},
            "finish_reason": "stop"
          }
        ]
        "#);
    }
}
