//! dropcast Daemon - Connection registry, directory watcher and SSE server
//!
//! This crate provides the core infrastructure for the dropcast daemon:
//! - `registry` - Connection registry actor that fans events out to clients
//! - `watcher` - Directory watcher turning new files into events
//! - `server` - HTTP endpoints (stream, trigger, status)
//! - `config` - Server configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      dropcastd daemon                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   HttpServer    │────▶│     RegistryActor           │   │
//! │  │    (axum)       │     │  (connection state owner)   │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             ▲                   │
//! │           │ GET /events                 │ broadcast         │
//! │           ▼                             │                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │  ClientStream   │     │    DirectoryWatcher         │   │
//! │  │  (per client)   │     │    (notify)                 │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod registry;
pub mod server;
pub mod watcher;
