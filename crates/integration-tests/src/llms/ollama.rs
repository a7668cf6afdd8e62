use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::stream;
use serde_json::{Value, json};

use super::provider::{CREATED_AT, MockState, TestBackend};

/// Builder for a mock Ollama server speaking `/api/chat`.
#[derive(Clone)]
pub struct OllamaMock {
    chunks: Vec<String>,
    always_streams: bool,
    injected_lines: Vec<String>,
    error: Option<(StatusCode, String)>,
    endless: bool,
}

impl Default for OllamaMock {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaMock {
    /// Answers "Hello! How can I help?", streamed in three pieces.
    pub fn new() -> Self {
        Self {
            chunks: vec!["Hello".to_string(), "! How can".to_string(), " I help?".to_string()],
            always_streams: false,
            injected_lines: Vec::new(),
            error: None,
            endless: false,
        }
    }

    pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|chunk| chunk.to_string()).collect();
        self
    }

    /// Stream NDJSON even when the request says `stream: false`.
    pub fn always_streaming(mut self) -> Self {
        self.always_streams = true;
        self
    }

    /// Send `line` verbatim after the first chunk of a stream.
    pub fn with_stream_line(mut self, line: impl Into<String>) -> Self {
        self.injected_lines.push(line.into());
        self
    }

    pub fn with_error(mut self, status: u16, body: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.error = Some((status, body.into()));
        self
    }

    /// Streams never finish, a chunk every few milliseconds.
    pub fn endless(mut self) -> Self {
        self.endless = true;
        self
    }
}

impl TestBackend for OllamaMock {
    fn backend_type(&self) -> &'static str {
        "ollama"
    }

    fn router(self, state: Arc<MockState>) -> Router {
        Router::new()
            .route("/api/chat", post(chat))
            .with_state(Arc::new(OllamaState { mock: self, state }))
    }
}

struct OllamaState {
    mock: OllamaMock,
    state: Arc<MockState>,
}

async fn chat(State(ollama): State<Arc<OllamaState>>, Json(request): Json<Value>) -> Response {
    ollama.state.record(request.clone());

    let mock = &ollama.mock;

    if let Some((status, body)) = &mock.error {
        return (*status, body.clone()).into_response();
    }

    let model = request["model"].as_str().unwrap_or_default().to_string();

    // Ollama streams unless told otherwise.
    let streaming = mock.always_streams || request["stream"].as_bool().unwrap_or(true);

    if !streaming {
        return Json(final_line(&model, &mock.chunks.concat())).into_response();
    }

    if mock.endless {
        return ndjson(endless_stream(model, ollama.state.stream_guard()));
    }

    let mut lines = Vec::new();

    for (i, chunk) in mock.chunks.iter().enumerate() {
        lines.push(chunk_line(&model, chunk).to_string());

        if i == 0 {
            lines.extend(mock.injected_lines.iter().cloned());
        }
    }

    lines.push(final_line(&model, "").to_string());

    let body = lines.join("\n") + "\n";

    // Small network chunks, so lines arrive split across reads.
    let pieces: Vec<_> = body
        .as_bytes()
        .chunks(16)
        .map(|piece| Ok::<_, Infallible>(Bytes::copy_from_slice(piece)))
        .collect();

    ndjson(Body::from_stream(stream::iter(pieces)))
}

fn endless_stream(model: String, guard: super::provider::StreamGuard) -> Body {
    let lines = stream::unfold((guard, 0u64), move |(guard, n)| {
        let line = format!("{}\n", chunk_line(&model, &format!("tick {n}")));

        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Some((Ok::<_, Infallible>(line), (guard, n + 1)))
        }
    });

    Body::from_stream(lines)
}

fn ndjson(body: Body) -> Response {
    Response::builder()
        .header(CONTENT_TYPE, "application/x-ndjson")
        .body(body)
        .unwrap()
}

fn chunk_line(model: &str, content: &str) -> Value {
    json!({
        "model": model,
        "created_at": CREATED_AT,
        "message": { "role": "assistant", "content": content },
        "done": false
    })
}

fn final_line(model: &str, content: &str) -> Value {
    json!({
        "model": model,
        "created_at": CREATED_AT,
        "message": { "role": "assistant", "content": content },
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 3,
        "eval_count": 2
    })
}
