//! Registry actor - owns all client streams and processes commands.
//!
//! The RegistryActor is the single owner of connection state in the system.
//! It receives commands via an mpsc channel and writes records straight into
//! each client's sink.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Sink write failures are logged and turn into disconnects

use std::collections::HashMap;

use dropcast_core::{ConnectionId, Event};
use dropcast_protocol::encode_record;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::commands::{DisconnectReason, RegistryCommand};
use super::sink::EventSink;

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns every registered client stream.
///
/// Implements the actor pattern: receives commands via mpsc channel and
/// processes them sequentially.
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands sequentially.
/// All map mutations, including removals triggered by failed writes,
/// happen within this single task, so broadcast never iterates a map that
/// is being modified.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::UnboundedReceiver<RegistryCommand>,

    /// Live connections keyed by id
    connections: HashMap<ConnectionId, Box<dyn EventSink>>,
}

impl RegistryActor {
    /// Creates a new registry actor.
    pub fn new(receiver: mpsc::UnboundedReceiver<RegistryCommand>) -> Self {
        Self {
            receiver,
            connections: HashMap::new(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    /// This is the main entry point - call this in a spawned task.
    pub async fn run(mut self) {
        info!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            "Registry actor stopped (clients: {})",
            self.connections.len()
        );
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Connect {
                connection_id,
                sink,
            } => {
                self.handle_connect(connection_id, sink);
            }
            RegistryCommand::Disconnect { connection_id } => {
                self.handle_disconnect(&connection_id, DisconnectReason::Explicit);
            }
            RegistryCommand::Broadcast { event } => {
                self.handle_broadcast(&event);
            }
            RegistryCommand::ClientCount { respond_to } => {
                // Ignore send error - caller may have dropped the receiver
                let _ = respond_to.send(self.connections.len());
            }
            RegistryCommand::CloseAll => {
                self.handle_close_all();
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Registers a stream and greets it with a "connected" event.
    ///
    /// A stream that is already closed when the greeting is written is never
    /// stored.
    fn handle_connect(&mut self, connection_id: ConnectionId, mut sink: Box<dyn EventSink>) {
        if self.connections.contains_key(&connection_id) {
            warn!(
                client_id = %connection_id,
                "Connection id already registered, rejecting stream"
            );
            return;
        }

        match encode_record(&Event::connected()) {
            Ok(record) => {
                if let Err(e) = sink.send_record(record) {
                    debug!(
                        client_id = %connection_id,
                        error = %e,
                        "Client stream closed before greeting"
                    );
                    return;
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to encode connected event");
            }
        }

        self.connections.insert(connection_id.clone(), sink);

        info!(
            client_id = %connection_id,
            total_clients = self.connections.len(),
            "Client connected"
        );
    }

    /// Removes a connection. No-op for ids that are not registered.
    fn handle_disconnect(&mut self, connection_id: &ConnectionId, reason: DisconnectReason) {
        if self.connections.remove(connection_id).is_some() {
            info!(
                client_id = %connection_id,
                reason = %reason,
                remaining_clients = self.connections.len(),
                "Client disconnected"
            );
        }
    }

    /// Writes the event to every connection, dropping the ones that fail.
    fn handle_broadcast(&mut self, event: &Event) {
        if self.connections.is_empty() {
            return;
        }

        // Encode once; every recipient gets the same bytes
        let record = match encode_record(event) {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Failed to encode event");
                return;
            }
        };

        debug!(
            clients = self.connections.len(),
            message = %event.message,
            "Broadcasting event"
        );

        let mut failed_clients = Vec::new();

        for (connection_id, sink) in self.connections.iter_mut() {
            if let Err(e) = sink.send_record(record.clone()) {
                debug!(
                    client_id = %connection_id,
                    error = %e,
                    "Failed to send event to client"
                );
                failed_clients.push(connection_id.clone());
            }
        }

        for connection_id in failed_clients {
            self.handle_disconnect(&connection_id, DisconnectReason::WriteFailed);
        }
    }

    /// Drops every sink so the corresponding streams terminate.
    fn handle_close_all(&mut self) {
        let closed = self.connections.len();
        for (connection_id, _) in self.connections.drain() {
            debug!(
                client_id = %connection_id,
                reason = %DisconnectReason::Shutdown,
                "Client disconnected"
            );
        }

        if closed > 0 {
            info!(closed, "Closed all client connections");
        }
    }

    /// Returns the number of connections (for testing).
    #[cfg(test)]
    pub fn client_count(&self) -> usize {
        self.connections.len()
    }
}
