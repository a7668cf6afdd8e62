//! Per-request logging with request ids.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::body::Body;
use http::{HeaderValue, Request, Response};
use tower::Layer;

/// Header echoing the request id to the client.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Id assigned to a request, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Assigns every request an id and logs its outcome.
#[derive(Clone, Default)]
pub struct RequestLogLayer;

impl<Service> Layer<Service> for RequestLogLayer
where
    Service: Send + Clone,
{
    type Service = RequestLogService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RequestLogService { next }
    }
}

#[derive(Clone)]
pub struct RequestLogService<Service> {
    next: Service,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RequestLogService<Service>
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

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();

        let request_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        req.extensions_mut().insert(RequestId(request_id.clone()));

        Box::pin(async move {
            let start = Instant::now();
            let result = next.call(req).await;
            let duration_ms = (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;

            let mut response = match result {
                Ok(response) => response,
                Err(e) => {
                    log::error!(
                        request_id = request_id.as_str(),
                        method = method.as_str(),
                        path = path.as_str(),
                        duration_ms = duration_ms;
                        "{method} {path} failed: {e}"
                    );

                    return Err(e);
                }
            };

            let status = response.status().as_u16();

            log::info!(
                request_id = request_id.as_str(),
                method = method.as_str(),
                path = path.as_str(),
                status = status,
                duration_ms = duration_ms;
                "{method} {path} {status} {duration_ms}ms"
            );

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }

            Ok(response)
        })
    }
}
