use std::time::Instant;

use metrics::{counter, histogram};

use super::{HTTP_REQUEST_LATENCY, HTTP_REQUESTS_TOTAL};

/// Times one HTTP request and records it when the response status is known.
///
/// Recording is a no-op until [`init`](super::init) installed the recorder.
///
/// ```rust
/// use telemetry::metrics::Recorder;
///
/// let recorder = Recorder::new("GET", "/v1/models");
/// // ... handle the request ...
/// recorder.record(200);
/// ```
pub struct Recorder {
    start: Instant,
    method: String,
    path: String,
}

impl Recorder {
    /// Starts timing a request.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            method: method.into(),
            path: path.into(),
        }
    }

    /// Increments the request counter and records the elapsed time in seconds.
    pub fn record(self, status: u16) {
        let latency = self.start.elapsed().as_secs_f64();

        counter!(
            HTTP_REQUESTS_TOTAL,
            "method" => self.method.clone(),
            "path" => self.path.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(HTTP_REQUEST_LATENCY, "method" => self.method, "path" => self.path).record(latency);
    }
}
