//! The writable side of a client stream.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from writing a record to a client stream.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The receiving side of the stream is gone.
    #[error("client stream closed")]
    Closed,
}

/// A long-lived output handle the registry pushes records into.
///
/// Implementations must not block: the registry calls `send_record` for
/// every connection in turn and a slow client must not delay the others.
/// Any error is treated as the client having gone away.
pub trait EventSink: Send + 'static {
    /// Queues one encoded record for delivery.
    fn send_record(&mut self, record: Bytes) -> Result<(), SinkError>;
}

/// Channel-backed sink; the receiver feeds an HTTP response body.
impl EventSink for mpsc::UnboundedSender<Bytes> {
    fn send_record(&mut self, record: Bytes) -> Result<(), SinkError> {
        self.send(record).map_err(|_| SinkError::Closed)
    }
}
