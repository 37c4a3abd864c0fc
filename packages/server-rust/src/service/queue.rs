//! Bounded multi-producer/multi-consumer hand-off of decoded operations.
//!
//! Built on a tokio `mpsc` channel. The single receiver is shared behind an
//! async mutex so that any number of workers can compete for the next
//! operation; whichever worker holds the lock when an item arrives gets it.

use std::sync::Arc;

use ordkv_core::Operation;
use tokio::sync::{mpsc, Mutex};

/// Error returned when every receiver is gone.
#[derive(Debug, thiserror::Error)]
#[error("operation queue closed")]
pub struct QueueClosed(pub Operation);

/// Factory for the operation queue's two halves.
pub struct OperationQueue;

impl OperationQueue {
    /// Creates a queue holding at most `capacity` operations.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn bounded(capacity: usize) -> (OperationSender, OperationReceiver) {
        assert!(capacity > 0, "operation queue capacity must be positive");
        let (tx, rx) = mpsc::channel(capacity);
        (
            OperationSender { tx },
            OperationReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }
}

/// Producer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OperationSender {
    tx: mpsc::Sender<Operation>,
}

impl OperationSender {
    /// Enqueues `op`, waiting while the queue is full.
    ///
    /// Cancel safe: dropping the future before it resolves enqueues nothing.
    ///
    /// # Errors
    ///
    /// Returns the operation back if all receivers have been dropped.
    pub async fn send(&self, op: Operation) -> Result<(), QueueClosed> {
        self.tx.send(op).await.map_err(|e| QueueClosed(e.0))
    }

    /// Number of operations currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer half, shared by all workers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OperationReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Operation>>>,
}

impl OperationReceiver {
    /// Takes the next operation, waiting while the queue is empty.
    ///
    /// Returns `None` once every sender is dropped and the queue is drained.
    /// Cancel safe: a cancelled call never loses an operation.
    pub async fn recv(&self) -> Option<Operation> {
        self.rx.lock().await.recv().await
    }
}
