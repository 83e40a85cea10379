//! Integration tests for the connection registry.
//!
//! These tests verify the registry works correctly as a complete system,
//! testing the spawn_registry() function and ConnectionRegistry interface
//! with real channel-backed client streams.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.
//! We test the panic-free behavior of production code through assertions.

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use dropcast_core::{ConnectionId, Event};
use dropcast_protocol::SseDecoder;
use dropcastd::registry::{spawn_registry, ConnectionRegistry};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for a record on a client stream
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Test Helpers
// ============================================================================

/// A connected client reading its own stream.
struct TestClient {
    id: ConnectionId,
    receiver: mpsc::UnboundedReceiver<Bytes>,
    raw: Vec<u8>,
    decoder: SseDecoder,
}

impl TestClient {
    fn connect(registry: &ConnectionRegistry) -> Self {
        let (sink, receiver) = mpsc::unbounded_channel();
        let id = registry.connect(sink).expect("connect");
        Self {
            id,
            receiver,
            raw: Vec::new(),
            decoder: SseDecoder::new(),
        }
    }

    /// Waits for the next event on this client's stream.
    async fn recv(&mut self) -> Event {
        loop {
            if let Some(event) = self.decoder.next_event() {
                return event.expect("valid event record");
            }
            let chunk = timeout(RECV_TIMEOUT, self.receiver.recv())
                .await
                .expect("timed out waiting for event")
                .expect("stream closed");
            self.raw.extend_from_slice(&chunk);
            self.decoder.push_bytes(&chunk);
        }
    }

    /// Returns every event already delivered, without waiting.
    fn drain(&mut self) -> Vec<Event> {
        while let Ok(chunk) = self.receiver.try_recv() {
            self.raw.extend_from_slice(&chunk);
            self.decoder.push_bytes(&chunk);
        }
        let mut events = Vec::new();
        while let Some(event) = self.decoder.next_event() {
            events.push(event.expect("valid event record"));
        }
        events
    }

    /// Consumes the greeting every new stream starts with.
    async fn expect_greeting(&mut self) {
        let greeting = self.recv().await;
        assert_eq!(greeting.message, "Connected to SSE");
        assert!(greeting.filename.is_none());
        assert!(greeting.data.is_none());
    }
}

/// Waits until the actor has processed every command queued so far.
///
/// The registry handles commands strictly in order, so answering a count
/// query means everything sent before it is done.
async fn settle(registry: &ConnectionRegistry) -> usize {
    registry.client_count().await
}

// ============================================================================
// Basic Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_basic_lifecycle() {
    let registry = spawn_registry();
    assert_eq!(registry.client_count().await, 0);

    let mut client = TestClient::connect(&registry);
    client.expect_greeting().await;
    assert_eq!(registry.client_count().await, 1);

    registry.disconnect(&client.id);
    assert_eq!(registry.client_count().await, 0);

    assert!(registry.is_connected());
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let registry = spawn_registry();

    let clients: Vec<TestClient> = (0..200).map(|_| TestClient::connect(&registry)).collect();
    let ids: HashSet<&ConnectionId> = clients.iter().map(|c| &c.id).collect();

    assert_eq!(ids.len(), 200);
    assert_eq!(registry.client_count().await, 200);
}

#[tokio::test]
async fn test_count_accuracy_with_repeated_disconnects() {
    let registry = spawn_registry();

    let clients: Vec<TestClient> = (0..10).map(|_| TestClient::connect(&registry)).collect();

    // Disconnect the first four, each twice, plus an id that never existed
    for client in clients.iter().take(4) {
        registry.disconnect(&client.id);
        registry.disconnect(&client.id);
    }
    registry.disconnect(&ConnectionId::new("never-connected"));

    assert_eq!(registry.client_count().await, 6);

    // Interleave more connects and disconnects
    let extra = TestClient::connect(&registry);
    registry.disconnect(&clients[5].id);
    registry.disconnect(&extra.id);
    registry.disconnect(&extra.id);
    let _late = TestClient::connect(&registry);

    assert_eq!(registry.client_count().await, 6);
}

// ============================================================================
// Broadcast Tests
// ============================================================================

#[tokio::test]
async fn test_fan_out_completeness() {
    let registry = spawn_registry();

    let mut a = TestClient::connect(&registry);
    let mut b = TestClient::connect(&registry);
    let mut c = TestClient::connect(&registry);
    let mut gone = TestClient::connect(&registry);
    registry.disconnect(&gone.id);

    registry.broadcast(Event::new("fan-out"));
    settle(&registry).await;

    for client in [&mut a, &mut b, &mut c] {
        let events = client.drain();
        let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["Connected to SSE", "fan-out"]);
    }

    // Only the greeting, sent before it was disconnected
    let events = gone.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "Connected to SSE");
}

#[tokio::test]
async fn test_identical_bytes_for_every_recipient() {
    let registry = spawn_registry();

    let mut a = TestClient::connect(&registry);
    let mut b = TestClient::connect(&registry);
    a.expect_greeting().await;
    b.expect_greeting().await;
    a.raw.clear();
    b.raw.clear();

    registry.broadcast(Event::new("same").with_data(json!({"k": [1, 2, 3]})));
    a.recv().await;
    b.recv().await;

    assert_eq!(a.raw, b.raw);
}

#[tokio::test]
async fn test_fault_isolation() {
    let registry = spawn_registry();

    let mut a = TestClient::connect(&registry);
    let b = TestClient::connect(&registry);
    let mut c = TestClient::connect(&registry);
    assert_eq!(settle(&registry).await, 3);

    // B's transport dies without an explicit disconnect
    drop(b);

    registry.broadcast(Event::new("survivors"));
    assert_eq!(registry.client_count().await, 2);

    a.expect_greeting().await;
    c.expect_greeting().await;
    assert_eq!(a.recv().await.message, "survivors");
    assert_eq!(c.recv().await.message, "survivors");
}

#[tokio::test]
async fn test_broadcast_with_no_clients_is_noop() {
    let registry = spawn_registry();

    registry.broadcast(Event::new("nobody listening"));
    assert_eq!(registry.client_count().await, 0);
    assert!(registry.is_connected());
}

#[tokio::test]
async fn test_ordering_within_client() {
    let registry = spawn_registry();

    let mut client = TestClient::connect(&registry);
    client.expect_greeting().await;

    for i in 0..50 {
        registry.broadcast(Event::new(format!("event-{i}")));
    }

    for i in 0..50 {
        assert_eq!(client.recv().await.message, format!("event-{i}"));
    }
}

#[tokio::test]
async fn test_greeting_precedes_broadcasts() {
    let registry = spawn_registry();

    let mut client = TestClient::connect(&registry);
    registry.broadcast(Event::new("first broadcast"));

    assert_eq!(client.recv().await.message, "Connected to SSE");
    assert_eq!(client.recv().await.message, "first broadcast");
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[tokio::test]
async fn test_end_to_end_scenario() {
    let registry = spawn_registry();
    assert_eq!(registry.client_count().await, 0);

    let mut c1 = TestClient::connect(&registry);
    let mut c2 = TestClient::connect(&registry);
    c1.expect_greeting().await;
    c2.expect_greeting().await;
    c1.raw.clear();
    c2.raw.clear();

    let event = Event::new("hello").with_data(json!({"x": 1}));
    let expected = format!(
        "data: {{\"message\":\"hello\",\"data\":{{\"x\":1}},\"timestamp\":{}}}\n\n",
        event.timestamp
    );
    registry.broadcast(event);

    c1.recv().await;
    c2.recv().await;
    assert_eq!(String::from_utf8(c1.raw.clone()).unwrap(), expected);
    assert_eq!(String::from_utf8(c2.raw.clone()).unwrap(), expected);

    registry.disconnect(&c1.id);
    registry.broadcast(Event::new("second"));

    assert_eq!(c2.recv().await.message, "second");
    assert_eq!(registry.client_count().await, 1);
    assert!(c1.drain().is_empty());
}

#[tokio::test]
async fn test_close_all_ends_every_stream() {
    let registry = spawn_registry();

    let mut a = TestClient::connect(&registry);
    let mut b = TestClient::connect(&registry);

    registry.close_all();
    assert_eq!(registry.client_count().await, 0);

    for client in [&mut a, &mut b] {
        client.expect_greeting().await;
        let end = timeout(RECV_TIMEOUT, client.receiver.recv())
            .await
            .expect("stream should end");
        assert!(end.is_none());
    }

    // The registry keeps working afterwards
    let mut fresh = TestClient::connect(&registry);
    fresh.expect_greeting().await;
    assert_eq!(registry.client_count().await, 1);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_connect_disconnect_broadcast() {
    let registry = spawn_registry();

    let mut tasks = Vec::new();
    for i in 0..40 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let mut client = TestClient::connect(&registry);
            registry.broadcast(Event::new(format!("from-{i}")));
            client.expect_greeting().await;
            if i % 2 == 0 {
                registry.disconnect(&client.id);
            }
            client
        }));
    }

    let mut clients = Vec::new();
    for task in tasks {
        clients.push(task.await.expect("task panicked"));
    }

    assert_eq!(registry.client_count().await, 20);
    drop(clients);

    // Dropped streams are discovered on the next broadcast
    registry.broadcast(Event::new("sweep"));
    assert_eq!(registry.client_count().await, 0);
}
