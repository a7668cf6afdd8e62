//! Metric names exposed on the scrape endpoint.

/// Counter of handled HTTP requests, labeled by method, path and status.
pub const HTTP_REQUESTS_TOTAL: &str = "genai_requests_total";

/// Histogram of HTTP request latency in seconds, labeled by method and path.
pub const HTTP_REQUEST_LATENCY: &str = "genai_request_latency_seconds";
