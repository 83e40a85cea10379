//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dropcast_protocol::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No route matched.
    #[error("Not Found - {path}")]
    NotFound { path: String },

    /// The registry is no longer running.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn path(&self) -> Option<String> {
        match self {
            Self::NotFound { path } => Some(path.clone()),
            Self::ServiceUnavailable(_) => None,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = ErrorResponse::new(status.as_u16(), self.to_string(), self.path());
        (status, Json(body)).into_response()
    }
}
