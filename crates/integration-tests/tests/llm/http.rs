use indoc::indoc;
use integration_tests::{
    TestServer,
    llms::{Framing, MockBackend, OpenAIMock},
};
use serde_json::json;

use super::{chunks, hello};

/// A gateway routing `company-gpt` to the given OpenAI-compatible mock.
async fn routed(mock: OpenAIMock) -> (TestServer, MockBackend) {
    let mut builder = TestServer::builder();
    let backend = builder.spawn_backend("http-mcp", mock).await;

    let config = indoc! {r#"
        [llm.routing]
        company-gpt = "http-mcp"
    "#};

    (builder.build(config).await, backend)
}

#[tokio::test]
async fn non_streaming_body_is_relayed() {
    let (server, _backend) = routed(OpenAIMock::new()).await;

    let body = server.llm_client("/").completions(hello("company-gpt", false)).await;

    // Fields outside the OpenAI subset survive the round trip.
    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(body, @r#"
        {
          "choices": [
            {
              "finish_reason": "stop",
              "index": 0,
              "logprobs": null,
              "message": {
                "content": "This is a test response",
                "role": "assistant"
              }
            }
          ],
          "created": 1714564800,
          "id": "chatcmpl-mock",
          "model": "company-gpt",
          "object": "chat.completion",
          "system_fingerprint": "fp_mock",
          "usage": {
            "completion_tokens": 15,
            "prompt_tokens": 10,
            "total_tokens": 25
          }
        }
        "#);
    });
}

#[tokio::test]
async fn request_is_forwarded_with_its_parameters() {
    let (server, backend) = routed(OpenAIMock::new()).await;

    let request = json!({
        "model": "company-gpt",
        "messages": [
            {"role": "system", "content": "Be brief"},
            {"role": "user", "content": "Hello"}
        ],
        "temperature": 0.5,
        "max_tokens": 64
    });

    server.llm_client("/").completions(request).await;

    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(backend.requests(), @r#"
        [
          {
            "max_tokens": 64,
            "messages": [
              {
                "content": "Be brief",
                "role": "system"
              },
              {
                "content": "Hello",
                "role": "user"
              }
            ],
            "model": "company-gpt",
            "stream": false,
            "temperature": 0.5
          }
        ]
        "#);
    });
}

#[tokio::test]
async fn invalid_body_is_a_backend_error() {
    let (server, _backend) = routed(OpenAIMock::new().with_invalid_body()).await;

    let response = server.llm_client("/").completions_raw(hello("company-gpt", false)).await;
    assert_eq!(response.status(), 502);

    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();

    assert!(
        message.starts_with("Invalid response from backend 'http-mcp'"),
        "{message}"
    );
}

async fn stream_with(mock: OpenAIMock) -> Vec<String> {
    let (server, _backend) = routed(mock).await;
    server.llm_client("/").completions_stream(hello("company-gpt", true)).await
}

#[tokio::test]
async fn stream_is_relayed_with_a_single_done() {
    let events = stream_with(OpenAIMock::new()).await;

    assert_eq!(events.iter().filter(|data| *data == "[DONE]").count(), 1);

    let chunks = chunks(&events);
    let content: String = chunks
        .iter()
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str())
        .collect();

    assert_eq!(content, "This is a test response");
    assert_eq!(chunks.last().unwrap()["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn done_is_added_when_the_backend_omits_it() {
    let events = stream_with(OpenAIMock::new().without_done()).await;

    assert_eq!(events.len(), 5);
    assert_eq!(events.last().unwrap(), "[DONE]");
}

#[tokio::test]
async fn framing_is_normalized() {
    let standard = stream_with(OpenAIMock::new()).await;
    let compact = stream_with(OpenAIMock::new().with_framing(Framing::Compact)).await;
    let bare = stream_with(OpenAIMock::new().with_framing(Framing::Bare)).await;

    assert_eq!(standard.len(), 5);
    assert_eq!(compact, standard);
    assert_eq!(bare, standard);
}

#[tokio::test]
async fn raw_sse_framing() {
    let (server, _backend) = routed(OpenAIMock::new().with_framing(Framing::Bare)).await;

    let response = server
        .llm_client("/")
        .completions_raw(hello("company-gpt", true))
        .await;

    let body = response.text().await.unwrap();
    let frames: Vec<&str> = body.split_terminator("\n\n").collect();

    assert_eq!(frames.len(), 5);
    assert!(frames.iter().all(|frame| frame.starts_with("data: ")), "{body}");
    assert_eq!(frames[4], "data: [DONE]");
}
