//! Reader loop moving messages from the external transport onto the
//! operation queue.
//!
//! For every received message the dispatcher decodes the body, hands the
//! operation to the queue (waiting while it is full) and then acknowledges
//! the message at the source. Messages that cannot be decoded are logged and
//! left unacknowledged for the transport's own redelivery policy.
//!
//! Acknowledgement happens at hand-off, not after a worker applied the
//! operation: a crash between the two loses that operation even though the
//! transport promised at-least-once delivery.

use std::sync::Arc;
use std::time::Duration;

use ordkv_core::messages::decode;
use tracing::{debug, info, warn};

use super::config::{ServerConfig, MIN_POLL_WAIT};
use super::queue::OperationSender;
use super::shutdown::{wait_for_shutdown, ShutdownController};
use crate::traits::{MessageSource, RawMessage};

/// Counters accumulated over one [`Dispatcher::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Messages handed out by the source.
    pub received: u64,
    /// Operations pushed onto the queue.
    pub enqueued: u64,
    /// Messages acknowledged at the source.
    pub acknowledged: u64,
    /// Messages dropped for an empty or undecodable body.
    pub rejected: u64,
    /// Failed polls.
    pub transport_errors: u64,
}

enum HandOff {
    Enqueued { acknowledged: bool },
    Rejected,
    Stopped,
}

/// Polls a [`MessageSource`] and feeds the operation queue until shutdown.
pub struct Dispatcher {
    source: Arc<dyn MessageSource>,
    queue: OperationSender,
    max_messages: usize,
    wait_time: Duration,
    error_backoff: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(source: Arc<dyn MessageSource>, queue: OperationSender, config: &ServerConfig) -> Self {
        Self {
            source,
            queue,
            max_messages: config.max_messages_per_poll,
            wait_time: config.wait_time.max(MIN_POLL_WAIT),
            error_backoff: config.poll_error_backoff.max(MIN_POLL_WAIT),
        }
    }

    /// Runs the receive/decode/enqueue/acknowledge loop until shutdown is
    /// signalled or the queue closes.
    ///
    /// Shutdown interrupts every wait: a pending poll, the back-off after a
    /// failed poll, and a hand-off blocked on a full queue.
    pub async fn run(&self, shutdown: &ShutdownController) -> DispatchStats {
        let mut signal = shutdown.shutdown_receiver();
        let mut stats = DispatchStats::default();

        'poll: loop {
            let received = tokio::select! {
                biased;
                () = wait_for_shutdown(&mut signal) => break 'poll,
                batch = self.source.receive(self.max_messages, self.wait_time) => batch,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    stats.transport_errors += 1;
                    warn!("{e}");
                    tokio::select! {
                        biased;
                        () = wait_for_shutdown(&mut signal) => break 'poll,
                        () = tokio::time::sleep(self.error_backoff) => continue 'poll,
                    }
                }
            };

            for message in &messages {
                stats.received += 1;
                match self.hand_off(message, &mut signal).await {
                    HandOff::Enqueued { acknowledged } => {
                        stats.enqueued += 1;
                        if acknowledged {
                            stats.acknowledged += 1;
                        }
                    }
                    HandOff::Rejected => stats.rejected += 1,
                    HandOff::Stopped => break 'poll,
                }
            }
        }

        info!(
            received = stats.received,
            enqueued = stats.enqueued,
            rejected = stats.rejected,
            "stopping message reader"
        );
        stats
    }

    async fn hand_off(
        &self,
        message: &RawMessage,
        signal: &mut tokio::sync::watch::Receiver<bool>,
    ) -> HandOff {
        let Some(body) = message.body.as_deref() else {
            warn!(receipt = %message.receipt, "received message with empty body");
            return HandOff::Rejected;
        };

        let op = match decode(body) {
            Ok(op) => op,
            Err(e) => {
                warn!(receipt = %message.receipt, "error parsing message: {e}");
                return HandOff::Rejected;
            }
        };

        let operation = op.name();
        let sent = tokio::select! {
            biased;
            () = wait_for_shutdown(signal) => return HandOff::Stopped,
            sent = self.queue.send(op) => sent,
        };
        if let Err(e) = sent {
            warn!("{e}, dropping {}", e.0);
            return HandOff::Stopped;
        }

        let acknowledged = match self.source.acknowledge(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("error deleting message: {e}");
                false
            }
        };
        debug!(receipt = %message.receipt, operation, acknowledged, "message handed off");

        HandOff::Enqueued { acknowledged }
    }
}
