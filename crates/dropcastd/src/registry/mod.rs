//! Connection registry using Actor pattern.
//!
//! The registry is the single owner of every open client stream. It receives
//! commands via a tokio mpsc channel and is the source of truth for how many
//! clients are connected.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  HTTP handlers   │────▶│  RegistryActor  │────▶│  Client streams │
//! │  DirectoryWatcher│     │                 │     │  (EventSink)    │
//! └──────────────────┘     └─────────────────┘     └─────────────────┘
//!         │                        │                       │
//!         │   RegistryCommand      │  HashMap<ConnectionId,│
//!         │   (mpsc channel)       │  Box<dyn EventSink>>  │
//!         ▼                        ▼                       ▼
//!   connect/disconnect/     sequential command      `data: {...}\n\n`
//!   broadcast               processing              records
//! ```
//!
//! Because only the actor task touches the map, a disconnect racing a
//! broadcast is simply ordered before or after it; no lock is held across
//! writes, and writes never block (sinks are non-blocking).
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;

mod actor;
mod commands;
mod handle;
mod sink;

pub use actor::RegistryActor;
pub use commands::{DisconnectReason, RegistryCommand, RegistryError};
pub use handle::ConnectionRegistry;
pub use sink::{EventSink, SinkError};

/// Spawn the registry actor and return a handle for interaction.
///
/// The command channel is unbounded: connecting, disconnecting and
/// broadcasting never wait on the actor, so they can be called from
/// synchronous contexts such as `Drop` impls and watcher threads.
///
/// # Example
///
/// ```no_run
/// use dropcastd::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = spawn_registry();
///
///     let clients = registry.client_count().await;
///     assert_eq!(clients, 0);
/// }
/// ```
pub fn spawn_registry() -> ConnectionRegistry {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let actor = RegistryActor::new(cmd_rx);
    tokio::spawn(actor.run());

    ConnectionRegistry::new(cmd_tx)
}
