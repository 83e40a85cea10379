//! JSON bodies of the HTTP endpoints.

use dropcast_core::{now_millis, Event, TRIGGERED_MESSAGE};
use serde::{Deserialize, Serialize};

/// Body accepted by the manual trigger endpoint.
///
/// Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Event message; empty or missing falls back to "Event triggered"
    #[serde(default)]
    pub message: Option<String>,

    /// Payload forwarded verbatim
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl TriggerRequest {
    /// Builds the event to broadcast, stamping it with the server's clock.
    pub fn into_event(self) -> Event {
        let message = self
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| TRIGGERED_MESSAGE.to_string());

        let event = Event::new(message);
        match self.data {
            Some(data) => event.with_data(data),
            None => event,
        }
    }
}

/// Response of the manual trigger endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub success: bool,
    pub event_data: Event,
}

impl TriggerResponse {
    /// A successful trigger carrying the broadcast event.
    pub fn ok(event_data: Event) -> Self {
        Self {
            success: true,
            event_data,
        }
    }
}

/// Response of the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always "ok" while the server answers
    pub status: String,

    /// Number of live streaming connections
    pub clients: usize,

    /// Process uptime in seconds
    pub uptime: f64,

    /// Server time in epoch milliseconds
    pub timestamp: i64,
}

impl StatusResponse {
    /// Creates a status snapshot stamped now.
    pub fn ok(clients: usize, uptime: f64) -> Self {
        Self {
            status: "ok".to_string(),
            clients,
            uptime,
            timestamp: now_millis(),
        }
    }
}

/// Error body returned by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status code
    pub status: u16,

    /// Description of the failure
    pub message: String,

    /// Server time in epoch milliseconds
    pub timestamp: i64,

    /// Request path, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorResponse {
    /// Creates an error body stamped now.
    pub fn new(status: u16, message: impl Into<String>, path: Option<String>) -> Self {
        Self {
            status,
            message: message.into(),
            timestamp: now_millis(),
            path,
        }
    }
}
