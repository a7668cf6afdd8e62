//! GenAI router server library.
//!
//! Provides a reusable server function to serve the router either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod auth;
mod client_identity;
mod health;
mod metrics;
mod rate_limit;
mod request_log;

use std::{net::SocketAddr, sync::Arc};

use ::rate_limit::RateLimitManager;
use anyhow::anyhow;
use axum::{Router, routing::get};
use config::Config;
use llm::ConnectionPool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{auth::AuthLayer, metrics::MetricsLayer, rate_limit::RateLimitLayer, request_log::RequestLogLayer};

pub use request_log::REQUEST_ID_HEADER;

/// Configuration for serving the router.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized TOML configuration.
    pub config: Config,
    /// Cancelling this token stops accepting connections and shuts the server down gracefully.
    pub shutdown_signal: CancellationToken,
}

/// Starts and runs the server with the provided configuration.
///
/// Returns once the shutdown signal fired and in-flight requests finished. The shared backend
/// client is closed before returning.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
    }: ServeConfig,
) -> anyhow::Result<()> {
    let pool = Arc::new(ConnectionPool::new(&config.llm.timeouts));
    let app = router(&config, pool.clone())?;

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    log::info!("OpenAI-compatible endpoint available at: http://{listen_address}{}", config.llm.path);

    if config.server.health.enabled {
        log::info!("Health endpoint available at: http://{listen_address}{}", config.server.health.path);
    }

    if config.server.metrics.enabled {
        log::info!("Metrics endpoint available at: http://{listen_address}{}", config.server.metrics.path);
    }

    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal.cancelled_owned())
        .await;

    pool.close();
    log::info!("Server stopped");

    result.map_err(|e| anyhow!("Failed to start HTTP server: {e}"))
}

/// Assemble the application router.
///
/// Protected routes pass authentication, then rate limiting, before reaching a handler. The
/// health and metrics endpoints are neither authenticated nor rate limited.
///
/// Fails if the metrics recorder cannot be installed.
pub fn router(config: &Config, pool: Arc<ConnectionPool>) -> anyhow::Result<Router> {
    let mut protected_router = llm::router(&config.llm, pool);

    match config.server.active_rate_limit() {
        Some(quota) => {
            log::debug!("Applying HTTP rate limiting middleware to protected routes");
            protected_router = protected_router.layer(RateLimitLayer::new(RateLimitManager::new(Some(quota))));
        }
        None => log::debug!("Rate limiting disabled"),
    }

    // Added last so it runs first: the rate limiter sees the verified key.
    if config.server.auth.enabled() {
        log::debug!(
            "API key authentication enabled with {} key(s)",
            config.server.auth.api_keys.len()
        );

        protected_router = protected_router.layer(AuthLayer::new(&config.server.auth));
    } else {
        log::warn!("No API keys configured, authentication is disabled");
    }

    let mut app = Router::new().merge(protected_router);

    if config.server.health.enabled {
        app = app.route(&config.server.health.path, get(health::health));
    }

    if config.server.metrics.enabled {
        if config.server.health.enabled && config.server.health.path == config.server.metrics.path {
            return Err(anyhow!(
                "Health and metrics endpoints share the path {}",
                config.server.metrics.path
            ));
        }

        let handle = telemetry::metrics::init()?;
        let metrics_router = Router::new()
            .route(&config.server.metrics.path, get(metrics::render))
            .with_state(handle);

        app = app.merge(metrics_router).layer(MetricsLayer);
    }

    Ok(app.layer(RequestLogLayer))
}
