pub mod llms;

use std::{net::SocketAddr, time::Duration};

use config::Config;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use llms::{MockBackend, TestBackend};
use server::ServeConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Test client for making HTTP requests to the test server
#[derive(Clone)]
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            api_key: None,
        }
    }

    /// The same client, presenting `key` as a bearer token.
    pub fn with_api_key(&self, key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..self.clone()
        }
    }

    /// A request builder for the given path, carrying the API key if one is set.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));

        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::GET, path).send().await.unwrap()
    }
}

/// Client for the OpenAI-compatible endpoints.
pub struct LlmTestClient {
    client: TestClient,
    path: String,
}

impl LlmTestClient {
    pub fn new(client: TestClient, path: &str) -> Self {
        Self {
            client,
            path: path.trim_end_matches('/').to_string(),
        }
    }

    /// Send a chat completion and return the raw response.
    pub async fn completions_raw(&self, request: serde_json::Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/v1/chat/completions", self.path), &request)
            .await
    }

    /// Send a non-streaming chat completion, expecting success.
    pub async fn completions(&self, request: serde_json::Value) -> serde_json::Value {
        let response = self.completions_raw(request).await;
        let status = response.status();
        let body = response.text().await.unwrap();

        assert_eq!(status, 200, "unexpected response: {body}");

        serde_json::from_str(&body).unwrap()
    }

    /// Send a streaming chat completion and collect the data of every event.
    pub async fn completions_stream(&self, request: serde_json::Value) -> Vec<String> {
        let response = self.completions_raw(request).await;
        assert_eq!(response.status(), 200);

        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"), "{content_type}");

        response
            .bytes_stream()
            .eventsource()
            .map(|event| event.unwrap().data)
            .collect()
            .await
    }

    /// List the advertised models, expecting success.
    pub async fn list_models(&self) -> serde_json::Value {
        let response = self.client.get(&format!("{}/v1/models", self.path)).await;
        assert_eq!(response.status(), 200);

        response.json().await.unwrap()
    }
}

/// Collects mock backends before starting the server.
#[derive(Default)]
pub struct TestServerBuilder {
    backends: Vec<MockBackend>,
}

impl TestServerBuilder {
    /// Start a mock backend and register it under `name` in the generated configuration.
    pub async fn spawn_backend(&mut self, name: &str, backend: impl TestBackend) -> MockBackend {
        let backend = backend.spawn(name).await.unwrap();
        self.backends.push(backend.clone());

        backend
    }

    /// Start the server with the given TOML configuration plus the registered backends.
    pub async fn build(self, config_toml: &str) -> TestServer {
        let mut config_toml = config_toml.to_string();

        for backend in &self.backends {
            config_toml.push_str(&backend.config_section());
        }

        let config: Config = toml::from_str(&config_toml).unwrap();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let shutdown_signal = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
            shutdown_signal: shutdown_signal.clone(),
        };

        let handle = tokio::spawn(async move {
            if let Err(e) = server::serve(serve_config).await {
                eprintln!("Server failed to start: {e}");
            }
        });

        // Wait until the server accepts connections.
        for _ in 0..50 {
            if TcpStream::connect(address).await.is_ok() {
                break;
            }

            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestServer {
            client: TestClient::new(format!("http://{address}")),
            address,
            shutdown_signal,
            handle: Some(handle),
        }
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    shutdown_signal: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    /// Start a new test server with the given TOML configuration and no mock backends.
    pub async fn start(config_toml: &str) -> Self {
        Self::builder().build(config_toml).await
    }

    /// Client for the chat endpoints mounted at `path`.
    pub fn llm_client(&self, path: &str) -> LlmTestClient {
        LlmTestClient::new(self.client.clone(), path)
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        self.shutdown_signal.cancel();

        if let Some(handle) = self.handle.take() {
            handle.await.unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_signal.cancel();
    }
}
