//! HTTP server for the dropcast daemon.
//!
//! The server:
//! - Listens on a TCP port for HTTP requests
//! - Opens a registry-backed event stream per `GET /events`
//! - Broadcasts manually triggered events and reports status
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HttpServer    │
//! │                 │
//! │  TcpListener    │
//! └───────┬─────────┘
//!         │ axum::serve
//!         ▼
//! ┌─────────────────┐     ┌─────────────────────┐
//! │    handlers     │────▶│ ConnectionRegistry  │
//! │                 │     │                     │
//! └─────────────────┘     └─────────────────────┘
//!         │
//!         │ ClientStream (per client)
//!         ▼
//! ┌─────────────────┐
//! │  SSE clients    │
//! └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Server errors are returned to the caller

mod error;
mod handlers;
mod stream;

pub use error::HttpError;
pub use stream::ClientStream;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{CorsConfig, CorsOrigin, ServerConfig};
use crate::registry::ConnectionRegistry;

/// How long open connections get to finish after shutdown is requested
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the connection registry
    pub registry: ConnectionRegistry,

    /// When the state was created, for uptime reporting
    started_at: Instant,
}

impl AppState {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self {
            registry,
            started_at: Instant::now(),
        }
    }

    /// Seconds since startup.
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Builds the CORS layer.
///
/// Browsers reject `*` together with credentials, so with credentials
/// enabled a wildcard policy echoes the request's origin, methods and
/// headers instead.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = match &config.origin {
        CorsOrigin::Any if config.credentials => AllowOrigin::mirror_request(),
        CorsOrigin::Any => AllowOrigin::from(Any),
        CorsOrigin::List(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %o, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(allowed)
        }
    };

    if config.credentials {
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Builds the application router.
pub fn build_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/events", get(handlers::events))
        .route("/trigger-event", post(handlers::trigger_event))
        .route("/status", get(handlers::status))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
}

/// HTTP server for the dropcast daemon.
pub struct HttpServer {
    /// Listen port and CORS policy
    config: ServerConfig,

    /// Handle to the connection registry
    registry: ConnectionRegistry,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
}

impl HttpServer {
    /// Creates a new server.
    pub fn new(
        config: ServerConfig,
        registry: ConnectionRegistry,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry,
            cancel_token,
        }
    }

    /// Builds the router this server serves.
    pub fn router(&self) -> Router {
        build_router(AppState::new(self.registry.clone()), &self.config.cors)
    }

    /// Binds the configured port on all interfaces and serves until cancelled.
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                error: e.to_string(),
            })?;

        self.serve(listener).await
    }

    /// Serves on an already bound listener until the token is cancelled.
    ///
    /// On cancellation every client stream is closed so in-flight responses
    /// can complete; if they haven't within [`SHUTDOWN_GRACE_PERIOD`], the
    /// server gives up with [`ServerError::ShutdownTimeout`].
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        match listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "Server running"),
            Err(e) => warn!(error = %e, "Server running on unknown address"),
        }

        let registry = self.registry.clone();
        let shutdown_token = self.cancel_token.clone();
        let shutdown = async move {
            shutdown_token.cancelled().await;
            info!("Shutting down gracefully...");
            registry.close_all();
        };

        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .into_future();

        let deadline_token = self.cancel_token.clone();
        let deadline = async move {
            deadline_token.cancelled().await;
            tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;
        };

        tokio::select! {
            result = server => {
                result?;
                info!("HTTP server closed");
                Ok(())
            }
            _ = deadline => {
                error!("Could not close connections in time, forcefully shutting down");
                Err(ServerError::ShutdownTimeout {
                    grace: SHUTDOWN_GRACE_PERIOD,
                })
            }
        }
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connections still open {grace:?} after shutdown was requested")]
    ShutdownTimeout { grace: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            error: "address in use".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:3000"));
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn test_cors_layer_variants_are_usable() {
        use axum::body::Body;
        use axum::http::{Request, Response};
        use std::convert::Infallible;
        use tower::Layer;

        // tower-http panics when a layer combining wildcards with
        // credentials is applied; every config must survive that.
        for origin in ["*", "http://a.test,http://b.test"] {
            for credentials in [false, true] {
                let layer = cors_layer(&CorsConfig::new(origin, credentials));
                let _service = layer.layer(tower::service_fn(|_: Request<Body>| async {
                    Ok::<_, Infallible>(Response::new(Body::empty()))
                }));
            }
        }
    }

    #[tokio::test]
    async fn test_uptime_increases() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let state = AppState::new(ConnectionRegistry::new(tx));
        let first = state.uptime_secs();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(state.uptime_secs() > first);
    }
}
