use std::time::{Duration, Instant};

use indoc::{formatdoc, indoc};
use integration_tests::{
    TestServer,
    llms::{OllamaMock, OpenAIMock, TestBackend, unreachable_address},
};
use serde_json::json;

use super::{hello, zero_config};

#[tokio::test]
async fn backend_error_status_is_a_bad_gateway() {
    let mut builder = TestServer::builder();
    let backend = builder
        .spawn_backend("http-mcp", OpenAIMock::new().with_error(500, "upstream exploded"))
        .await;

    let config = indoc! {r#"
        [llm]
        default_backend = "http-mcp"
    "#};

    let server = builder.build(config).await;

    let response = server.llm_client("/").completions_raw(hello("gpt-4", false)).await;
    assert_eq!(response.status(), 502);

    let body: serde_json::Value = response.json().await.unwrap();
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Backend error 500: upstream exploded"
    }
    "#);

    // No retries.
    assert_eq!(backend.request_count(), 1);
}

#[tokio::test]
async fn unreachable_backend_is_a_bad_gateway() {
    let config = formatdoc! {r#"
        [llm]
        ollama_base_url = "http://{address}"
    "#, address = unreachable_address().await};

    let server = TestServer::start(&config).await;

    for stream in [false, true] {
        let response = server.llm_client("/").completions_raw(hello("llama3", stream)).await;
        assert_eq!(response.status(), 502);

        let body: serde_json::Value = response.json().await.unwrap();
        let message = body["error"].as_str().unwrap();

        assert!(message.starts_with("Failed to connect to backend"), "{message}");
    }
}

#[tokio::test]
async fn non_streaming_calls_are_bounded() {
    let ollama = OllamaMock::new()
        .always_streaming()
        .endless()
        .spawn("ollama")
        .await
        .unwrap();

    let config = formatdoc! {r#"
        [llm]
        ollama_base_url = "{base_url}"

        [llm.timeouts]
        request = "500ms"
    "#, base_url = ollama.base_url()};

    let server = TestServer::start(&config).await;

    let started = Instant::now();
    let response = server.llm_client("/").completions_raw(hello("llama3", false)).await;

    assert_eq!(response.status(), 502);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let (server, ollama) = zero_config(OllamaMock::new()).await;

    let request = json!({ "model": "llama3", "messages": [] });
    let response = server.llm_client("/").completions_raw(request).await;

    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Invalid request: messages must not be empty"
    }
    "#);

    assert_eq!(ollama.request_count(), 0);
}

#[tokio::test]
async fn malformed_request_body_is_rejected() {
    let (server, ollama) = zero_config(OllamaMock::new()).await;

    let response = server
        .client
        .request(reqwest::Method::POST, "/v1/chat/completions")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(ollama.request_count(), 0);
}
