//! Registry actor commands and errors.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `DisconnectReason`: Why a connection left the registry

use std::fmt;

use dropcast_core::{ConnectionId, Event};
use thiserror::Error;
use tokio::sync::oneshot;

use super::sink::EventSink;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Everything except `ClientCount` is fire-and-forget; `ClientCount` answers
/// through a oneshot channel.
pub enum RegistryCommand {
    /// Register a new client stream.
    ///
    /// The actor writes a "connected" event to the sink before storing it.
    Connect {
        /// Freshly generated id for this connection
        connection_id: ConnectionId,
        /// Writable side of the client's stream
        sink: Box<dyn EventSink>,
    },

    /// Remove a connection. Unknown ids are ignored.
    Disconnect {
        /// ID of the connection to remove
        connection_id: ConnectionId,
    },

    /// Write an event to every registered connection.
    Broadcast {
        /// The event to deliver
        event: Event,
    },

    /// Report the number of registered connections.
    ClientCount {
        /// Channel to send the result
        respond_to: oneshot::Sender<usize>,
    },

    /// Drop every connection, ending their streams.
    CloseAll,
}

impl fmt::Debug for RegistryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { connection_id, .. } => f
                .debug_struct("Connect")
                .field("connection_id", connection_id)
                .finish_non_exhaustive(),
            Self::Disconnect { connection_id } => f
                .debug_struct("Disconnect")
                .field("connection_id", connection_id)
                .finish(),
            Self::Broadcast { event } => f.debug_struct("Broadcast").field("event", event).finish(),
            Self::ClientCount { .. } => f.debug_struct("ClientCount").finish_non_exhaustive(),
            Self::CloseAll => f.write_str("CloseAll"),
        }
    }
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
///
/// Registry state never causes an error: there is no capacity limit and
/// duplicate disconnects are no-ops. The only failure is a stopped actor.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The command channel was closed.
    ///
    /// This indicates the actor was shut down.
    #[error("registry channel closed")]
    ChannelClosed,
}

// ============================================================================
// Disconnect Reasons
// ============================================================================

/// Reason a connection was removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The transport reported the client went away.
    Explicit,

    /// A write to the client's stream failed during broadcast.
    WriteFailed,

    /// The registry was asked to close every connection.
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "client closed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Shutdown => write!(f, "registry shutdown"),
        }
    }
}
