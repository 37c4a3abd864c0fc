//! In-process message queue with receive/acknowledge semantics.
//!
//! Received messages move from the ready list to an in-flight table keyed by
//! receipt handle. Acknowledging removes them for good; anything left in
//! flight can be put back with [`InMemoryQueue::requeue_unacknowledged`],
//! which stands in for a visibility timeout on a real broker.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::traits::{MessageSink, MessageSource, RawMessage, TransportError};

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Option<String>>,
    in_flight: HashMap<String, Option<String>>,
}

/// Unbounded in-memory queue implementing both transport traits.
#[derive(Debug)]
pub struct InMemoryQueue {
    name: String,
    state: Mutex<QueueState>,
    available: Notify,
}

impl InMemoryQueue {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            available: Notify::new(),
        }
    }

    /// Enqueues a message without a body, as some brokers deliver.
    pub fn send_empty(&self) {
        self.push(None);
    }

    /// Messages waiting to be received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Messages received but not yet acknowledged.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Returns every unacknowledged message to the front of the queue so it
    /// is delivered again. Returns how many were requeued.
    pub fn requeue_unacknowledged(&self) -> usize {
        let count = {
            let mut state = self.state.lock();
            let returned: Vec<Option<String>> =
                state.in_flight.drain().map(|(_, body)| body).collect();
            let count = returned.len();
            for body in returned.into_iter().rev() {
                state.ready.push_front(body);
            }
            count
        };
        if count > 0 {
            self.available.notify_waiters();
        }
        count
    }

    fn push(&self, body: Option<String>) {
        self.state.lock().ready.push_back(body);
        self.available.notify_waiters();
    }

    fn take_batch(&self, max_messages: usize) -> Vec<RawMessage> {
        let mut state = self.state.lock();
        let count = max_messages.min(state.ready.len());
        let bodies: Vec<Option<String>> = state.ready.drain(..count).collect();
        let mut batch = Vec::with_capacity(count);
        for body in bodies {
            let receipt = uuid::Uuid::new_v4().to_string();
            state.in_flight.insert(receipt.clone(), body.clone());
            batch.push(RawMessage { receipt, body });
        }
        batch
    }
}

#[async_trait]
impl MessageSource for InMemoryQueue {
    fn describe(&self) -> String {
        format!("memory://{}", self.name)
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<RawMessage>, TransportError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Register interest before checking, so a concurrent push between
            // the check and the wait is not missed.
            let notified = self.available.notified();
            let batch = self.take_batch(max_messages);
            if !batch.is_empty() {
                return Ok(batch);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn acknowledge(&self, message: &RawMessage) -> Result<(), TransportError> {
        match self.state.lock().in_flight.remove(&message.receipt) {
            Some(_) => Ok(()),
            None => Err(TransportError::Acknowledge {
                receipt: message.receipt.clone(),
                reason: "unknown receipt handle".to_string(),
            }),
        }
    }
}

#[async_trait]
impl MessageSink for InMemoryQueue {
    async fn send(&self, body: String) -> Result<(), TransportError> {
        self.push(Some(body));
        Ok(())
    }
}
