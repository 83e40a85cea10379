//! The event payload pushed to every connected client.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Message of the synthetic event written to a stream right after it connects.
pub const CONNECTED_MESSAGE: &str = "Connected to SSE";

/// Message of events produced by the directory watcher.
pub const FILE_ADDED_MESSAGE: &str = "New file added";

/// Message used for manually triggered events that don't carry their own.
pub const TRIGGERED_MESSAGE: &str = "Event triggered";

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// An event broadcast to clients.
///
/// Serialized identically for every recipient. Field order on the wire is
/// `message`, `filename`, `data`, `timestamp`; absent optional fields are
/// omitted entirely rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Human-readable description of what happened
    pub message: String,

    /// Name of the file that triggered the event (watcher events only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Opaque caller-supplied payload, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Creation time in epoch milliseconds
    pub timestamp: i64,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            filename: None,
            data: None,
            timestamp: now_millis(),
        }
    }

    /// The event written to a stream as soon as it is registered.
    pub fn connected() -> Self {
        Self::new(CONNECTED_MESSAGE)
    }

    /// The event produced when a new entry shows up in a watched directory.
    pub fn file_added(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::new(FILE_ADDED_MESSAGE)
        }
    }

    /// Attaches an opaque payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
