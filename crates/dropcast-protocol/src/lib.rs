//! dropcast Protocol - Wire formats for event delivery
//!
//! This crate provides the text/event-stream framing used on every client
//! connection and the JSON bodies exchanged with the HTTP endpoints.

pub mod message;
pub mod sse;

pub use message::{ErrorResponse, StatusResponse, TriggerRequest, TriggerResponse};
pub use sse::{encode_record, ProtocolError, SseDecoder, SSE_HEADERS};
