//! HTTP metrics middleware and the Prometheus scrape endpoint.
//!
//! Every request increments `genai_requests_total{method,path,status}` and records its latency in
//! `genai_request_latency_seconds{method,path}`. The path label is the matched route, so request
//! parameters never create new series.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    response::IntoResponse,
};
use http::{Request, Response, header};
use telemetry::metrics::{PrometheusHandle, Recorder};
use tower::Layer;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Layer for HTTP metrics tracking
#[derive(Clone, Default)]
pub struct MetricsLayer;

impl<Service> Layer<Service> for MetricsLayer
where
    Service: Send + Clone,
{
    type Service = MetricsService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        MetricsService { next }
    }
}

/// Service that tracks HTTP metrics
#[derive(Clone)]
pub struct MetricsService<Service> {
    next: Service,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for MetricsService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|matched_path| matched_path.as_str().to_owned())
            .unwrap_or_else(|| "unknown".to_string());

        let recorder = Recorder::new(req.method().as_str(), path);
        let mut next = self.next.clone();

        Box::pin(async move {
            let response = next.call(req).await?;
            recorder.record(response.status().as_u16());

            Ok(response)
        })
    }
}

/// Renders all recorded metrics in the Prometheus text format.
pub(crate) async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render())
}
