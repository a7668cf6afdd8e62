use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Backend resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Neither a route nor a default backend exists for the model.
    #[error("No backend configured for model '{0}' and no default backend")]
    NoBackend(String),
    /// The model resolves to a backend name missing from the backend definitions.
    #[error("Model '{model}' resolves to backend '{backend}', which is not configured")]
    UnknownBackend {
        /// Requested model.
        model: String,
        /// Backend name the routing table points to.
        backend: String,
    },
}

/// A backend call failed.
///
/// Carries the remote status when the backend answered with one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    /// HTTP status returned by the backend.
    pub status: Option<u16>,
    /// Diagnostic message, including the remote body for error statuses.
    pub message: String,
}

impl BackendError {
    /// Error without a remote status, e.g. a connection or parse failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Error for a backend that answered with an error status.
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status: Some(status),
            message: format!("Backend error {status}: {body}"),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("Backend request timed out: {error}")
        } else if error.is_connect() {
            format!("Failed to connect to backend: {error}")
        } else {
            format!("Backend request failed: {error}")
        };

        Self {
            status: error.status().map(|status| status.as_u16()),
            message,
        }
    }
}

/// Client-visible failure of a gateway request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Missing or invalid API key.
    #[error("Unauthorized")]
    Unauthorized,
    /// The client exhausted its request quota.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Time until the client is admitted again.
        retry_after: Duration,
    },
    /// No backend could be resolved for the requested model.
    #[error(transparent)]
    Unconfigured(#[from] ConfigurationError),
    /// The backend failed or could not be reached.
    #[error("{message}")]
    BackendUnavailable {
        /// HTTP status returned by the backend.
        status: Option<u16>,
        /// Diagnostic message.
        message: String,
    },
    /// The resolved backend has a type the gateway cannot talk to.
    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),
    /// The request body is well-formed JSON but not a usable request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<BackendError> for GatewayError {
    fn from(error: BackendError) -> Self {
        Self::BackendUnavailable {
            status: error.status,
            message: error.message,
        }
    }
}

impl GatewayError {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unconfigured(_) | Self::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::UnsupportedBackend(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            log::error!("Server error ({}): {self}", status.as_u16());
        } else {
            log::debug!("Request rejected ({}): {self}", status.as_u16());
        }

        let body = Json(ErrorResponse { error: self.to_string() });
        let mut response = (status, body).into_response();

        match self {
            Self::Unauthorized => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::RateLimited { retry_after } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
            }
            _ => {}
        }

        response
    }
}
