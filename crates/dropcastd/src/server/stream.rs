//! Response body for a single streaming client.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use dropcast_core::ConnectionId;
use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::registry::{ConnectionRegistry, RegistryError};

/// The body of a `GET /events` response.
///
/// Yields the records the registry writes into this client's sink. The
/// stream ends when the registry drops the sink (shutdown). Dropping the
/// stream, which hyper does when the client goes away, disconnects it from
/// the registry.
pub struct ClientStream {
    connection_id: ConnectionId,
    receiver: mpsc::UnboundedReceiver<Bytes>,
    registry: ConnectionRegistry,
}

impl ClientStream {
    /// Registers a new channel-backed client with the registry.
    pub fn open(registry: &ConnectionRegistry) -> Result<Self, RegistryError> {
        let (sink, receiver) = mpsc::unbounded_channel();
        let connection_id = registry.connect(sink)?;

        Ok(Self {
            connection_id,
            receiver,
            registry: registry.clone(),
        })
    }

    /// Returns the id assigned by the registry.
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }
}

impl Stream for ClientStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx).map(|record| record.map(Ok))
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        debug!(client_id = %self.connection_id, "Client connection closed");
        self.registry.disconnect(&self.connection_id);
    }
}
