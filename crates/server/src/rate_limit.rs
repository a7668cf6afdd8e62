//! Rate limiting middleware for HTTP requests.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use http::{Request, Response};
use llm::GatewayError;
use rate_limit::RateLimitManager;
use tower::Layer;

use crate::client_identity::ClientIdentity;

#[derive(Clone)]
pub struct RateLimitLayer(RateLimitManager);

impl RateLimitLayer {
    pub fn new(manager: RateLimitManager) -> Self {
        Self(manager)
    }
}

impl<Service> Layer<Service> for RateLimitLayer
where
    Service: Send + Clone,
{
    type Service = RateLimitService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RateLimitService {
            next,
            manager: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<Service> {
    next: Service,
    manager: RateLimitManager,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RateLimitService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();

        // A verified identity from the auth layer, otherwise whatever the request tells us.
        let identity = req
            .extensions()
            .get::<ClientIdentity>()
            .cloned()
            .unwrap_or_else(|| ClientIdentity::from_request(&req));

        let result = self.manager.check(&identity.rate_limit_key());

        Box::pin(async move {
            match result {
                Ok(()) => next.call(req).await,
                Err(err) => {
                    log::debug!("Request from {identity} rejected due to rate limit: {err}");

                    Ok(GatewayError::RateLimited {
                        retry_after: err.retry_after(),
                    }
                    .into_response())
                }
            }
        })
    }
}
