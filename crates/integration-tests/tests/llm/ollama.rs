use integration_tests::llms::{CREATED, OllamaMock};
use serde_json::json;

use super::{chunks, hello, zero_config};

#[tokio::test]
async fn non_streaming_completion() {
    let (server, ollama) = zero_config(OllamaMock::new()).await;

    let body = server.llm_client("/").completions(hello("llama3", false)).await;

    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));

    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(body, { ".id" => "[id]" }, @r#"
        {
          "choices": [
            {
              "finish_reason": "stop",
              "index": 0,
              "message": {
                "content": "Hello! How can I help?",
                "role": "assistant"
              }
            }
          ],
          "created": 1714564800,
          "id": "[id]",
          "model": "llama3",
          "object": "chat.completion",
          "usage": {
            "completion_tokens": 2,
            "prompt_tokens": 3,
            "total_tokens": 5
          }
        }
        "#);
    });

    // Ollama receives its own request format.
    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(ollama.requests(), @r#"
        [
          {
            "messages": [
              {
                "content": "Hello",
                "role": "user"
              }
            ],
            "model": "llama3",
            "options": {
              "temperature": 1.0
            },
            "stream": false
          }
        ]
        "#);
    });
}

#[tokio::test]
async fn non_streaming_request_answered_with_a_stream() {
    let ollama = OllamaMock::new()
        .always_streaming()
        .with_stream_line(r#"{"model": "llama3", "mess"#);

    let (server, ollama) = zero_config(ollama).await;

    let body = server.llm_client("/").completions(hello("llama3", false)).await;

    assert_eq!(ollama.requests()[0]["stream"], false);

    // The last line that parses is the final message, and Ollama's final line has no content.
    assert_eq!(body["choices"][0]["message"], json!({"role": "assistant", "content": ""}));
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(
        body["usage"],
        json!({"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5})
    );
}

#[tokio::test]
async fn streaming_completion() {
    let (server, ollama) = zero_config(OllamaMock::new()).await;

    let events = server.llm_client("/").completions_stream(hello("llama3", true)).await;
    let chunks = chunks(&events);

    assert_eq!(ollama.requests()[0]["stream"], true);

    let id = chunks[0]["id"].as_str().unwrap();
    assert!(id.starts_with("chatcmpl-"));

    for chunk in &chunks {
        assert_eq!(chunk["id"], id);
        assert_eq!(chunk["object"], "chat.completion.chunk");
        assert_eq!(chunk["created"], CREATED);
        assert_eq!(chunk["model"], "llama3");
    }

    let choices: Vec<_> = chunks.iter().map(|chunk| chunk["choices"][0].clone()).collect();

    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(choices, @r#"
        [
          {
            "delta": {
              "content": "Hello",
              "role": "assistant"
            },
            "finish_reason": null,
            "index": 0
          },
          {
            "delta": {
              "content": "! How can",
              "role": "assistant"
            },
            "finish_reason": null,
            "index": 0
          },
          {
            "delta": {
              "content": " I help?",
              "role": "assistant"
            },
            "finish_reason": null,
            "index": 0
          },
          {
            "delta": {
              "content": "",
              "role": "assistant"
            },
            "finish_reason": "stop",
            "index": 0
          }
        ]
        "#);
    });
}

#[tokio::test]
async fn stream_keeps_backend_order() {
    let pieces: Vec<String> = (0..20).map(|i| format!("{i} ")).collect();
    let pieces: Vec<&str> = pieces.iter().map(String::as_str).collect();

    let (server, _ollama) = zero_config(OllamaMock::new().with_chunks(&pieces)).await;

    let events = server.llm_client("/").completions_stream(hello("llama3", true)).await;

    let content: String = chunks(&events)
        .iter()
        .map(|chunk| chunk["choices"][0]["delta"]["content"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(content, pieces.concat());
}

#[tokio::test]
async fn malformed_line_is_forwarded_raw() {
    let ollama = OllamaMock::new().with_stream_line("this is not json");
    let (server, _ollama) = zero_config(ollama).await;

    let events = server.llm_client("/").completions_stream(hello("llama3", true)).await;

    assert_eq!(events.len(), 6);
    assert_eq!(events[1], "this is not json");
    assert_eq!(events.last().unwrap(), "[DONE]");
}

#[tokio::test]
async fn error_line_is_forwarded_raw() {
    let line = r#"{"error":"model 'llama3' not found"}"#;
    let (server, _ollama) = zero_config(OllamaMock::new().with_stream_line(line)).await;

    let events = server.llm_client("/").completions_stream(hello("llama3", true)).await;

    assert_eq!(events[1], line);
}

#[tokio::test]
async fn error_status_before_the_stream() {
    let ollama = OllamaMock::new().with_error(404, "model 'llama9' not found");
    let (server, _ollama) = zero_config(ollama).await;

    let response = server.llm_client("/").completions_raw(hello("llama9", true)).await;

    assert_eq!(response.status(), 502);

    let body: serde_json::Value = response.json().await.unwrap();
    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Backend error 404: model 'llama9' not found"
    }
    "#);
}
