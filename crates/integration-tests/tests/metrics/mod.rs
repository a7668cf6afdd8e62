use indoc::indoc;
use integration_tests::{
    TestServer,
    llms::{OllamaMock, TestBackend},
};
use serde_json::json;

/// The series of `name` carrying every label in `labels`.
fn series<'a>(rendered: &'a str, name: &str, labels: &[&str]) -> Option<&'a str> {
    rendered
        .lines()
        .find(|line| line.starts_with(&format!("{name}{{")) && labels.iter().all(|label| line.contains(label)))
}

#[tokio::test]
async fn requests_are_counted_after_one_call() {
    let ollama = OllamaMock::new().spawn("ollama").await.unwrap();

    let config = format!("[llm]\nollama_base_url = \"{}\"\n", ollama.base_url());
    let server = TestServer::start(&config).await;

    let request = json!({
        "model": "llama3",
        "messages": [{"role": "user", "content": "Hello"}]
    });

    server.llm_client("/").completions(request).await;

    let response = server.client.get("/metrics").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain; version=0.0.4");

    let rendered = response.text().await.unwrap();

    let counter = series(
        &rendered,
        "genai_requests_total",
        &[r#"method="POST""#, r#"path="/v1/chat/completions""#, r#"status="200""#],
    );
    assert!(counter.is_some(), "{rendered}");

    let latency = series(
        &rendered,
        "genai_request_latency_seconds_count",
        &[r#"method="POST""#, r#"path="/v1/chat/completions""#],
    );
    assert!(latency.is_some(), "{rendered}");
}

#[tokio::test]
async fn metrics_endpoint_is_public() {
    let config = indoc! {r#"
        [server]
        rate_limit = "1/minute"

        [server.auth]
        api_keys = ["secret123"]

        [server.metrics]
        path = "/prometheus"
    "#};

    let server = TestServer::start(config).await;

    for _ in 0..3 {
        assert_eq!(server.client.get("/prometheus").await.status(), 200);
    }

    assert_eq!(server.client.get("/v1/models").await.status(), 401);
}

#[tokio::test]
async fn metrics_endpoint_disabled() {
    let config = indoc! {r#"
        [server.metrics]
        enabled = false
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.get("/metrics").await.status(), 404);
}
