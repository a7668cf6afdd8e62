use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use config::AuthConfig;
use http::{Request, Response};
use llm::GatewayError;
use secrecy::{ExposeSecret, SecretString};
use tower::Layer;

use crate::client_identity::{ClientIdentity, presented_token};

/// Rejects requests without one of the configured API keys.
///
/// The accepted key becomes the request's [`ClientIdentity`].
#[derive(Clone)]
pub struct AuthLayer(Arc<AuthLayerInner>);

struct AuthLayerInner {
    api_keys: Vec<SecretString>,
}

impl AuthLayerInner {
    fn accepts(&self, token: &str) -> bool {
        self.api_keys.iter().any(|key| key.expose_secret() == token)
    }
}

impl AuthLayer {
    pub fn new(config: &AuthConfig) -> Self {
        Self(Arc::new(AuthLayerInner {
            api_keys: config.api_keys.clone(),
        }))
    }
}

impl<Service> Layer<Service> for AuthLayer
where
    Service: Send + Clone,
{
    type Service = AuthService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AuthService {
            next,
            layer: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<Service> {
    next: Service,
    layer: Arc<AuthLayerInner>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AuthService<Service>
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

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();

        let token = presented_token(req.headers())
            .filter(|token| self.layer.accepts(token))
            .map(str::to_string);

        Box::pin(async move {
            let Some(token) = token else {
                log::debug!("Rejecting {} {}: missing or unknown API key", req.method(), req.uri().path());
                return Ok(GatewayError::Unauthorized.into_response());
            };

            req.extensions_mut().insert(ClientIdentity::Token(token));
            next.call(req).await
        })
    }
}
