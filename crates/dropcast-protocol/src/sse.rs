//! text/event-stream framing.
//!
//! Every event travels as a single `data:` field carrying the event's JSON,
//! terminated by a blank line:
//!
//! ```text
//! data: {"message":"hello","timestamp":1700000000000}
//!
//! ```

use bytes::{Bytes, BytesMut};
use dropcast_core::Event;
use thiserror::Error;

/// Response headers sent when a stream is opened.
///
/// `X-Accel-Buffering: no` keeps nginx-style reverse proxies from holding
/// records back in their buffers.
pub const SSE_HEADERS: [(&str, &str); 4] = [
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
    ("x-accel-buffering", "no"),
];

const DATA_FIELD: &str = "data:";

const RECORD_END: &[u8] = b"\n\n";

/// Errors from encoding or decoding event-stream records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The event could not be serialized.
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    /// A record payload was not a valid event.
    #[error("failed to decode event: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes an event as one complete event-stream record.
pub fn encode_record(event: &Event) -> Result<Bytes, ProtocolError> {
    let json = serde_json::to_string(event).map_err(ProtocolError::Encode)?;
    Ok(Bytes::from(format!("{DATA_FIELD} {json}\n\n")))
}

/// Incremental decoder for event-stream bodies.
///
/// Chunks may split records anywhere, including inside a multi-byte
/// character; bytes are buffered and each record is decoded as UTF-8 only
/// once its terminating blank line has arrived. Comment lines and fields
/// other than `data` are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
}

impl SseDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of the body.
    pub fn push(&mut self, chunk: &str) {
        self.push_bytes(chunk.as_bytes());
    }

    /// Appends raw body bytes.
    pub fn push_bytes(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Takes the data payload of the next complete record, if any.
    ///
    /// Multiple `data:` lines within one record are joined with `\n`.
    /// Records with no data lines (e.g. keep-alive comments) are skipped.
    /// Invalid UTF-8 within a complete record is replaced.
    pub fn next_payload(&mut self) -> Option<String> {
        loop {
            let end = self
                .buffer
                .windows(RECORD_END.len())
                .position(|window| window == RECORD_END)?;
            let record = self.buffer.split_to(end + RECORD_END.len());

            let mut payload: Option<String> = None;
            for line in String::from_utf8_lossy(&record).lines() {
                if let Some(value) = line.strip_prefix(DATA_FIELD) {
                    let value = value.strip_prefix(' ').unwrap_or(value);
                    match payload.as_mut() {
                        Some(existing) => {
                            existing.push('\n');
                            existing.push_str(value);
                        }
                        None => payload = Some(value.to_string()),
                    }
                }
            }

            if payload.is_some() {
                return payload;
            }
        }
    }

    /// Decodes the next complete record as an [`Event`].
    pub fn next_event(&mut self) -> Option<Result<Event, ProtocolError>> {
        self.next_payload()
            .map(|payload| serde_json::from_str(&payload).map_err(ProtocolError::Decode))
    }

    /// Returns true if a partial record is buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }
}
