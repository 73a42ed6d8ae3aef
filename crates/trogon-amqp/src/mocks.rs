//! In-memory [`AmqpPublisher`] for tests that must not touch a broker.
//!
//! Enabled with the `test-support` feature.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use bytes::Bytes;

use crate::publisher::{AmqpPublisher, OutgoingMessage, PublishError};
use crate::uri::ConnectionUri;

#[derive(Debug, Clone)]
pub struct MockError(pub String);

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub priority: u8,
    pub payload: Bytes,
    /// The URI the publisher was handed, unredacted.
    pub uri: String,
}

/// Records every publish; can be told to fail the next connect or publish.
#[derive(Clone, Default)]
pub struct MockPublisher {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    connections: Arc<AtomicUsize>,
    fail_connect: Arc<AtomicBool>,
    fail_publish: Arc<AtomicBool>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent publish fails as if the broker were down.
    pub fn fail_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Every subsequent publish connects, then fails on `basic.publish`.
    pub fn fail_publish(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Number of connection attempts, successful or not.
    pub fn connection_attempts(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl AmqpPublisher for MockPublisher {
    async fn publish(&self, uri: &ConnectionUri, message: OutgoingMessage) -> Result<(), PublishError> {
        self.connections.fetch_add(1, Ordering::SeqCst);

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable(Box::new(MockError(
                "connection refused".to_string(),
            ))));
        }

        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PublishError::Failed {
                exchange: message.exchange,
                source: Box::new(MockError("NOT_FOUND - no exchange".to_string())),
            });
        }

        self.published.lock().unwrap().push(PublishedMessage {
            exchange: message.exchange,
            routing_key: message.routing_key,
            priority: message.priority,
            payload: message.payload,
            uri: uri.expose().to_string(),
        });
        Ok(())
    }
}
