use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::Router;
use indoc::formatdoc;
use tokio::net::TcpListener;

/// Timestamp every mock backend reports, 2024-05-01T12:00:00Z.
pub const CREATED_AT: &str = "2024-05-01T12:00:00Z";
pub const CREATED: u64 = 1_714_564_800;

/// A mock backend that can be started on an ephemeral port.
pub trait TestBackend: Send + Sized + 'static {
    /// Value of `type` in the backend configuration.
    fn backend_type(&self) -> &'static str;

    /// The routes of the mock, recording into `state`.
    fn router(self, state: Arc<MockState>) -> Router;

    /// Start the mock server and return a handle to it.
    fn spawn(self, name: &str) -> impl Future<Output = anyhow::Result<MockBackend>> + Send {
        let name = name.to_string();

        async move {
            let backend_type = self.backend_type();
            let state = Arc::new(MockState::default());
            let app = self.router(state.clone());

            let listener = TcpListener::bind("127.0.0.1:0").await?;
            let address = listener.local_addr()?;

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Ok(MockBackend {
                name,
                backend_type,
                address,
                state,
            })
        }
    }
}

/// What a mock backend observed.
#[derive(Default)]
pub struct MockState {
    requests: Mutex<Vec<serde_json::Value>>,
    open_streams: AtomicUsize,
}

impl MockState {
    pub fn record(&self, request: serde_json::Value) {
        self.requests.lock().unwrap().push(request);
    }

    /// Counts a response stream as open until the guard is dropped.
    pub fn stream_guard(self: &Arc<Self>) -> StreamGuard {
        self.open_streams.fetch_add(1, Ordering::SeqCst);

        StreamGuard {
            state: Arc::clone(self),
        }
    }
}

pub struct StreamGuard {
    state: Arc<MockState>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.state.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub name: String,
    pub address: SocketAddr,
    backend_type: &'static str,
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// The `[llm.backends.<name>]` table pointing at this mock.
    pub fn config_section(&self) -> String {
        formatdoc! {r#"

            [llm.backends.{name}]
            type = "{backend_type}"
            base_url = "{base_url}"
        "#, name = self.name, backend_type = self.backend_type, base_url = self.base_url()}
    }

    /// Request bodies received so far, oldest first.
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// Response streams the mock is still writing.
    pub fn open_streams(&self) -> usize {
        self.state.open_streams.load(Ordering::SeqCst)
    }
}

/// A local address nothing listens on.
pub async fn unreachable_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
