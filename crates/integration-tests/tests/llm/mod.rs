mod cancellation;
mod error_handling;
mod http;
mod ollama;
mod routing;

use integration_tests::{
    TestServer,
    llms::{MockBackend, OllamaMock, TestBackend},
};
use serde_json::json;

/// A gateway in zero-config mode, forwarding everything to `ollama`.
async fn zero_config(ollama: OllamaMock) -> (TestServer, MockBackend) {
    let ollama = ollama.spawn("ollama").await.unwrap();

    let config = format!("[llm]\nollama_base_url = \"{}\"\n", ollama.base_url());
    let server = TestServer::start(&config).await;

    (server, ollama)
}

fn hello(model: &str, stream: bool) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": "Hello"}],
        "stream": stream
    })
}

/// The JSON payloads of a stream, without the closing `[DONE]`.
fn chunks(events: &[String]) -> Vec<serde_json::Value> {
    let (last, chunks) = events.split_last().unwrap();
    assert_eq!(last, "[DONE]");

    chunks.iter().map(|data| serde_json::from_str(data).unwrap()).collect()
}

#[tokio::test]
async fn models_in_zero_config_mode() {
    let (server, _ollama) = zero_config(OllamaMock::new()).await;

    let models = server.llm_client("/").list_models().await;

    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(models, @r#"
        {
          "data": [
            {
              "created": 0,
              "id": "llama3",
              "object": "model",
              "owned_by": "ollama"
            }
          ],
          "object": "list"
        }
        "#);
    });
}

#[tokio::test]
async fn routes_under_custom_path() {
    let ollama = OllamaMock::new().spawn("ollama").await.unwrap();

    let config = format!("[llm]\npath = \"/llm\"\nollama_base_url = \"{}\"\n", ollama.base_url());
    let server = TestServer::start(&config).await;

    let body = server.llm_client("/llm").completions(hello("llama3", false)).await;
    assert_eq!(body["object"], "chat.completion");

    let response = server.llm_client("/").completions_raw(hello("llama3", false)).await;
    assert_eq!(response.status(), 404);
}
