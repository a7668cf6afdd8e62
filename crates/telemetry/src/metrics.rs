//! Metrics initialization and rendering.

mod names;
mod recorder;

pub use metrics_exporter_prometheus::PrometheusHandle;
pub use names::*;
pub use recorder::Recorder;

use std::sync::OnceLock;

use anyhow::anyhow;
use metrics::{Unit, describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// The Prometheus default buckets, extended for slow generations.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0, 30.0, 60.0,
];

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide Prometheus recorder.
///
/// The recorder is global, so every server in the process shares it. Later calls return the
/// handle of the first one.
pub fn init() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }

    let recorder = PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)
        .map_err(|e| anyhow!("Failed to configure latency buckets: {e}"))?
        .build_recorder();

    let mut installed = None;

    let handle = HANDLE.get_or_init(|| {
        let handle = recorder.handle();
        installed = Some(recorder);

        handle
    });

    if let Some(recorder) = installed {
        metrics::set_global_recorder(recorder).map_err(|_| anyhow!("Another metrics recorder is already installed"))?;

        describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
        describe_histogram!(HTTP_REQUEST_LATENCY, Unit::Seconds, "Request latency in seconds");

        log::debug!("Prometheus metrics recorder installed");
    }

    Ok(handle.clone())
}
