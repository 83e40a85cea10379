//! Client interface for interacting with the RegistryActor.
//!
//! The `ConnectionRegistry` provides a cheap-to-clone interface for sending
//! commands to the registry actor.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `RegistryError::ChannelClosed`

use dropcast_core::{ConnectionId, Event};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::commands::{RegistryCommand, RegistryError};
use super::sink::EventSink;
use crate::watcher::FileAddedListener;

// ============================================================================
// Connection Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// This is a cheap-to-clone handle that can be shared across tasks and
/// threads. Commands are queued in the order they are sent, so a
/// `client_count` issued after a `connect` always observes it.
///
/// # Usage
///
/// ```ignore
/// let registry = spawn_registry();
///
/// let (sink, body) = tokio::sync::mpsc::unbounded_channel();
/// let id = registry.connect(sink)?;
///
/// registry.broadcast(Event::new("hello"));
/// registry.disconnect(&id);
/// ```
#[derive(Clone)]
pub struct ConnectionRegistry {
    /// Command sender to the actor
    sender: mpsc::UnboundedSender<RegistryCommand>,
}

impl ConnectionRegistry {
    /// Create a new registry handle.
    pub fn new(sender: mpsc::UnboundedSender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Register a client stream and return its freshly generated id.
    ///
    /// The stream receives a "connected" event before any broadcast traffic.
    /// The caller must call [`disconnect`](Self::disconnect) when the
    /// underlying transport closes.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub fn connect(&self, sink: impl EventSink) -> Result<ConnectionId, RegistryError> {
        let connection_id = ConnectionId::generate();

        self.send(RegistryCommand::Connect {
            connection_id: connection_id.clone(),
            sink: Box::new(sink),
        })?;

        Ok(connection_id)
    }

    /// Remove a connection.
    ///
    /// Idempotent: ids that are unknown or already removed are ignored.
    pub fn disconnect(&self, connection_id: &ConnectionId) {
        let result = self.send(RegistryCommand::Disconnect {
            connection_id: connection_id.clone(),
        });

        if result.is_err() {
            debug!(client_id = %connection_id, "Disconnect ignored: registry stopped");
        }
    }

    /// Deliver an event to every registered connection.
    ///
    /// Fire-and-forget: failed writes remove the affected connection and are
    /// never reported to the caller.
    pub fn broadcast(&self, event: Event) {
        if self.send(RegistryCommand::Broadcast { event }).is_err() {
            debug!("Broadcast dropped: registry stopped");
        }
    }

    /// Get the number of registered connections.
    ///
    /// Returns 0 if communication with the actor fails.
    pub async fn client_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();

        if self
            .send(RegistryCommand::ClientCount { respond_to: tx })
            .is_err()
        {
            return 0;
        }

        rx.await.unwrap_or_default()
    }

    /// Drop every connection, ending all client streams.
    pub fn close_all(&self) {
        if self.send(RegistryCommand::CloseAll).is_err() {
            debug!("Close-all ignored: registry stopped");
        }
    }

    /// Check if the registry actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    fn send(&self, cmd: RegistryCommand) -> Result<(), RegistryError> {
        self.sender
            .send(cmd)
            .map_err(|_| RegistryError::ChannelClosed)
    }
}

/// Lets the registry subscribe directly to a [`DirectoryWatcher`](crate::watcher::DirectoryWatcher).
impl FileAddedListener for ConnectionRegistry {
    fn notify(&self, event: &Event) -> anyhow::Result<()> {
        self.send(RegistryCommand::Broadcast {
            event: event.clone(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn create_test_handle() -> (ConnectionRegistry, mpsc::UnboundedReceiver<RegistryCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionRegistry::new(tx), rx)
    }

    #[test]
    fn test_connect_sends_command_with_generated_id() {
        let (handle, mut rx) = create_test_handle();
        let (sink, _body) = mpsc::unbounded_channel::<Bytes>();

        let id = handle.connect(sink).unwrap();

        match rx.try_recv().unwrap() {
            RegistryCommand::Connect { connection_id, .. } => assert_eq!(connection_id, id),
            other => panic!("Expected Connect, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_fails_when_actor_gone() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        let (sink, _body) = mpsc::unbounded_channel::<Bytes>();
        let result = handle.connect(sink);
        assert!(matches!(result, Err(RegistryError::ChannelClosed)));
        assert!(!handle.is_connected());
    }

    #[test]
    fn test_fire_and_forget_commands_never_fail() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        // None of these may panic or surface an error
        handle.disconnect(&ConnectionId::new("c1"));
        handle.broadcast(Event::new("lost"));
        handle.close_all();
    }

    #[tokio::test]
    async fn test_client_count_when_actor_gone() {
        let (handle, rx) = create_test_handle();
        drop(rx);
        assert_eq!(handle.client_count().await, 0);
    }

    #[test]
    fn test_listener_reports_stopped_registry() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        let result = FileAddedListener::notify(&handle, &Event::file_added("a.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_listener_queues_broadcast() {
        let (handle, mut rx) = create_test_handle();

        FileAddedListener::notify(&handle, &Event::file_added("a.txt")).unwrap();

        match rx.try_recv().unwrap() {
            RegistryCommand::Broadcast { event } => {
                assert_eq!(event.filename.as_deref(), Some("a.txt"));
            }
            other => panic!("Expected Broadcast, got {other:?}"),
        }
    }
}
