//! dropcast Core - Shared types for event broadcasting
//!
//! This crate provides the domain types shared between the wire
//! protocol (dropcast-protocol) and the daemon (dropcastd).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod connection;
pub mod event;

// Re-exports for convenience
pub use connection::ConnectionId;
pub use event::{now_millis, Event, CONNECTED_MESSAGE, FILE_ADDED_MESSAGE, TRIGGERED_MESSAGE};
