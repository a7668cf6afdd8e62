use indoc::indoc;
use integration_tests::{TestServer, llms::OllamaMock};
use serde_json::json;

async fn server_with_keys() -> (TestServer, integration_tests::llms::MockBackend) {
    let mut builder = TestServer::builder();
    let ollama = builder.spawn_backend("ollama", OllamaMock::new()).await;

    let config = indoc! {r#"
        [server.auth]
        api_keys = ["secret123", "other456"]

        [llm]
        default_backend = "ollama"
    "#};

    (builder.build(config).await, ollama)
}

fn hello() -> serde_json::Value {
    json!({
        "model": "llama3",
        "messages": [{"role": "user", "content": "Hello"}]
    })
}

#[tokio::test]
async fn missing_key_is_rejected_before_the_backend() {
    let (server, ollama) = server_with_keys().await;

    let response = server.llm_client("/").completions_raw(hello()).await;

    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");

    let body: serde_json::Value = response.json().await.unwrap();
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Unauthorized"
    }
    "#);

    assert_eq!(ollama.request_count(), 0);
}

#[tokio::test]
async fn unknown_key_is_rejected() {
    let (server, _ollama) = server_with_keys().await;

    let client = server.client.with_api_key("wrong");
    let response = client.get("/v1/models").await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn bearer_token_is_accepted() {
    let (server, ollama) = server_with_keys().await;

    let client = server.client.with_api_key("secret123");
    let llm = integration_tests::LlmTestClient::new(client, "/");

    let body = llm.completions(hello()).await;

    assert_eq!(body["choices"][0]["message"]["content"], "Hello! How can I help?");
    assert_eq!(ollama.request_count(), 1);
}

#[tokio::test]
async fn api_key_header_is_accepted() {
    let (server, _ollama) = server_with_keys().await;

    let response = server
        .client
        .request(reqwest::Method::GET, "/v1/models")
        .header("X-API-Key", "other456")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn health_needs_no_key() {
    let (server, _ollama) = server_with_keys().await;

    let response = server.client.get("/healthz").await;
    assert_eq!(response.status(), 200);
}
