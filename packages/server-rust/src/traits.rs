//! Collaborator interfaces for the external message transport.

use std::time::Duration;

use async_trait::async_trait;

/// A message as handed out by a [`MessageSource`].
///
/// `receipt` identifies this delivery and is what gets acknowledged; `body`
/// is the raw payload, `None` when the transport delivered an empty message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub receipt: String,
    pub body: Option<String>,
}

impl RawMessage {
    #[must_use]
    pub fn new(receipt: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            receipt: receipt.into(),
            body: Some(body.into()),
        }
    }
}

/// Failures talking to the external message transport.
///
/// None of these are fatal: the dispatcher logs them and polls again.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("error receiving messages: {0}")]
    Receive(String),
    #[error("error acknowledging message {receipt}: {reason}")]
    Acknowledge { receipt: String, reason: String },
    #[error("error sending message: {0}")]
    Send(String),
    #[error("transport closed")]
    Closed,
    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inbound side of the external queue.
///
/// Delivery is at-least-once: a message that is received but never
/// acknowledged may be handed out again later, at the transport's discretion.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Human-readable name of the queue, used in log lines.
    fn describe(&self) -> String;

    /// Receive up to `max_messages`, waiting at most `wait` for the first one.
    /// An empty batch means the wait elapsed without traffic.
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<RawMessage>, TransportError>;

    /// Remove the message from the source so it will not be redelivered.
    async fn acknowledge(&self, message: &RawMessage) -> Result<(), TransportError>;
}

/// Outbound side of the external queue, used by the client front end.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publish one encoded record.
    async fn send(&self, body: String) -> Result<(), TransportError>;
}
