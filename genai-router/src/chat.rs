//! The `chat` subcommand: one completion against a running gateway.

use std::time::Duration;

use anyhow::{Context, bail};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use llm::{ChatCompletionRequest, ChatMessage, Role};
use url::Url;

use crate::args::ChatArgs;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) async fn run(args: ChatArgs) -> anyhow::Result<()> {
    let request = ChatCompletionRequest {
        model: args.model,
        messages: vec![ChatMessage {
            role: Role::User,
            content: args.message,
        }],
        temperature: 1.0,
        stream: args.stream,
        extra: Default::default(),
    };

    let client = reqwest::Client::new();
    let mut builder = client.post(completions_url(&args.server)).json(&request);

    if let Some(key) = &args.api_key {
        builder = builder.bearer_auth(key);
    }

    // Streams may run as long as the model keeps generating.
    if !request.stream {
        builder = builder.timeout(REQUEST_TIMEOUT);
    }

    let response = builder
        .send()
        .await
        .with_context(|| format!("Failed to reach the gateway at {}", args.server))?;

    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Gateway returned {status}: {body}");
    }

    if !request.stream {
        let body: serde_json::Value = response.json().await.context("Gateway returned invalid JSON")?;
        println!("{}", serde_json::to_string_pretty(&body)?);

        return Ok(());
    }

    let mut events = response.bytes_stream().eventsource();

    while let Some(event) = events.next().await {
        let event = event.context("Failed to read the event stream")?;

        if event.data == "[DONE]" {
            break;
        }

        println!("{}", event.data);
    }

    Ok(())
}

fn completions_url(server: &Url) -> String {
    format!("{}/v1/chat/completions", server.as_str().trim_end_matches('/'))
}
