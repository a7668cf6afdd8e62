use std::{convert::Infallible, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::stream;
use serde_json::{Value, json};

use super::provider::{CREATED, MockState, TestBackend};

/// How the mock frames its streamed lines.
#[derive(Clone, Copy, Debug)]
pub enum Framing {
    /// `data: {...}` followed by a blank line.
    Standard,
    /// `data:{...}` without the space.
    Compact,
    /// The JSON alone on each line.
    Bare,
}

/// Builder for a mock OpenAI-compatible server.
#[derive(Clone)]
pub struct OpenAIMock {
    chunks: Vec<String>,
    framing: Framing,
    sends_done: bool,
    error: Option<(StatusCode, String)>,
    invalid_body: bool,
}

impl Default for OpenAIMock {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIMock {
    /// Answers "This is a test response", streamed word by word.
    pub fn new() -> Self {
        Self {
            chunks: vec!["This".to_string(), " is a".to_string(), " test response".to_string()],
            framing: Framing::Standard,
            sends_done: true,
            error: None,
            invalid_body: false,
        }
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// End streams without a `[DONE]` event.
    pub fn without_done(mut self) -> Self {
        self.sends_done = false;
        self
    }

    pub fn with_error(mut self, status: u16, body: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.error = Some((status, body.into()));
        self
    }

    /// Answer non-streaming requests with JSON that is not a chat completion.
    pub fn with_invalid_body(mut self) -> Self {
        self.invalid_body = true;
        self
    }
}

impl TestBackend for OpenAIMock {
    fn backend_type(&self) -> &'static str {
        "http"
    }

    fn router(self, state: Arc<MockState>) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(Arc::new(OpenAIState { mock: self, state }))
    }
}

struct OpenAIState {
    mock: OpenAIMock,
    state: Arc<MockState>,
}

async fn chat_completions(State(openai): State<Arc<OpenAIState>>, Json(request): Json<Value>) -> Response {
    openai.state.record(request.clone());

    let mock = &openai.mock;

    if let Some((status, body)) = &mock.error {
        return (*status, body.clone()).into_response();
    }

    let model = request["model"].as_str().unwrap_or_default().to_string();

    if !request["stream"].as_bool().unwrap_or(false) {
        if mock.invalid_body {
            return Json(json!({ "status": "ok" })).into_response();
        }

        return Json(completion(&model, &mock.chunks.concat())).into_response();
    }

    let mut payloads: Vec<String> = mock
        .chunks
        .iter()
        .enumerate()
        .map(|(i, content)| chunk(&model, i == 0, Some(content), None).to_string())
        .collect();

    payloads.push(chunk(&model, false, None, Some("stop")).to_string());

    if mock.sends_done {
        payloads.push("[DONE]".to_string());
    }

    let frames: Vec<_> = payloads
        .into_iter()
        .map(|payload| {
            let frame = match mock.framing {
                Framing::Standard => format!("data: {payload}\n\n"),
                Framing::Compact => format!("data:{payload}\n\n"),
                Framing::Bare => format!("{payload}\n"),
            };

            Ok::<_, Infallible>(frame)
        })
        .collect();

    Response::builder()
        .header(CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(stream::iter(frames)))
        .unwrap()
}

fn completion(model: &str, content: &str) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": CREATED,
        "model": model,
        "system_fingerprint": "fp_mock",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 15, "total_tokens": 25 }
    })
}

fn chunk(model: &str, first: bool, content: Option<&str>, finish_reason: Option<&str>) -> Value {
    let mut delta = serde_json::Map::new();

    if first {
        delta.insert("role".to_string(), json!("assistant"));
    }

    if let Some(content) = content {
        delta.insert("content".to_string(), json!(content));
    }

    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": CREATED,
        "model": model,
        "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }]
    })
}
