//! Route handlers.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dropcast_protocol::{StatusResponse, TriggerRequest, TriggerResponse, SSE_HEADERS};
use tracing::info;

use super::error::HttpError;
use super::stream::ClientStream;
use super::AppState;

/// `GET /events` - opens a long-lived event stream.
pub async fn events(State(state): State<AppState>) -> Result<Response, HttpError> {
    let stream = ClientStream::open(&state.registry)
        .map_err(|e| HttpError::ServiceUnavailable(e.to_string()))?;

    info!(client_id = %stream.connection_id(), "Client subscribed to events");

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    for (name, value) in SSE_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    Ok(response)
}

/// `POST /trigger-event` - broadcasts an event built from the request body.
///
/// The body is optional; anything that isn't a JSON object with string
/// `message` is treated as empty.
pub async fn trigger_event(
    State(state): State<AppState>,
    payload: Option<Json<TriggerRequest>>,
) -> Json<TriggerResponse> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let event = request.into_event();

    state.registry.broadcast(event.clone());

    Json(TriggerResponse::ok(event))
}

/// `GET /status` - connected clients, uptime and server time.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let clients = state.registry.client_count().await;
    Json(StatusResponse::ok(clients, state.uptime_secs()))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> HttpError {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    HttpError::NotFound { path }
}
