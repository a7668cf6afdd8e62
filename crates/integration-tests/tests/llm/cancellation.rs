use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use integration_tests::llms::OllamaMock;

use super::{hello, zero_config};

#[tokio::test]
async fn client_disconnect_releases_the_backend_stream() {
    let (server, ollama) = zero_config(OllamaMock::new().endless()).await;

    let response = server.llm_client("/").completions_raw(hello("llama3", true)).await;
    assert_eq!(response.status(), 200);

    let mut events = response.bytes_stream().eventsource();

    for _ in 0..3 {
        let event = events.next().await.unwrap().unwrap();
        let chunk: serde_json::Value = serde_json::from_str(&event.data).unwrap();

        assert!(chunk["choices"][0]["finish_reason"].is_null());
    }

    assert_eq!(ollama.open_streams(), 1);

    drop(events);

    let mut released = false;

    for _ in 0..100 {
        if ollama.open_streams() == 0 {
            released = true;
            break;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(released, "the backend stream is still being written");
}
