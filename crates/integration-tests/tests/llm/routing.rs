use indoc::{formatdoc, indoc};
use integration_tests::{
    TestServer,
    llms::{OllamaMock, OpenAIMock, TestBackend},
};

use super::hello;

#[tokio::test]
async fn models_follow_the_routing_table() {
    let mut builder = TestServer::builder();
    let ollama = builder.spawn_backend("ollama", OllamaMock::new()).await;
    let http = builder.spawn_backend("http-mcp", OpenAIMock::new()).await;

    let config = indoc! {r#"
        [llm]
        default_backend = "ollama"

        [llm.routing]
        company-gpt = "http-mcp"
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/");

    let body = llm.completions(hello("company-gpt", false)).await;
    assert_eq!(body["choices"][0]["message"]["content"], "This is a test response");
    assert_eq!((ollama.request_count(), http.request_count()), (0, 1));

    // Unmapped models go to the default backend.
    let body = llm.completions(hello("unmapped-model", false)).await;
    assert_eq!(body["choices"][0]["message"]["content"], "Hello! How can I help?");
    assert_eq!((ollama.request_count(), http.request_count()), (1, 1));

    // The same model keeps resolving to the same backend.
    llm.completions(hello("company-gpt", false)).await;
    assert_eq!((ollama.request_count(), http.request_count()), (1, 2));

    let models = llm.list_models().await;

    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(models, @r#"
        {
          "data": [
            {
              "created": 0,
              "id": "company-gpt",
              "object": "model",
              "owned_by": "http-mcp"
            },
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
async fn unmapped_model_without_default_is_unconfigured() {
    let mut builder = TestServer::builder();
    let ollama = builder.spawn_backend("ollama", OllamaMock::new()).await;

    let config = indoc! {r#"
        [llm.routing]
        llama3 = "ollama"
    "#};

    let server = builder.build(config).await;

    let response = server.llm_client("/").completions_raw(hello("x", false)).await;
    assert_eq!(response.status(), 502);

    let body: serde_json::Value = response.json().await.unwrap();
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "No backend configured for model 'x' and no default backend"
    }
    "#);

    assert_eq!(ollama.request_count(), 0);
}

#[tokio::test]
async fn routes_without_backends_never_reach_ollama() {
    let ollama = OllamaMock::new().spawn("ollama").await.unwrap();

    let config = formatdoc! {r#"
        [llm]
        ollama_base_url = "{base_url}"
        default_backend = "ollama"

        [llm.routing]
        company-gpt = "http-mcp"
    "#, base_url = ollama.base_url()};

    let server = TestServer::start(&config).await;
    let llm = server.llm_client("/");

    let response = llm.completions_raw(hello("company-gpt", false)).await;
    assert_eq!(response.status(), 502);

    let body: serde_json::Value = response.json().await.unwrap();
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Model 'company-gpt' resolves to backend 'http-mcp', which is not configured"
    }
    "#);

    let response = llm.completions_raw(hello("llama3", false)).await;
    assert_eq!(response.status(), 502);

    assert_eq!(ollama.request_count(), 0);
}

#[tokio::test]
async fn unsupported_backend_type_is_a_bad_request() {
    let mut builder = TestServer::builder();
    let ollama = builder.spawn_backend("ollama", OllamaMock::new()).await;

    let config = indoc! {r#"
        [llm]
        default_backend = "ollama"

        [llm.routing]
        claude = "anthropic"

        [llm.backends.anthropic]
        type = "anthropic"
        base_url = "http://127.0.0.1:9"
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/");

    let response = llm.completions_raw(hello("claude", false)).await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Unsupported backend type: anthropic"
    }
    "#);

    // Other models keep working.
    llm.completions(hello("llama3", false)).await;
    assert_eq!(ollama.request_count(), 1);
}
