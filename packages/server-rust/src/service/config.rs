use std::num::NonZeroUsize;
use std::time::Duration;

/// Default number of slots in the operation queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Floor for the poll wait and error back-off. An idle source must not turn
/// the dispatcher into a busy loop.
pub const MIN_POLL_WAIT: Duration = Duration::from_millis(10);

/// Server-level configuration for the dispatch and worker pipeline.
///
/// Controls parallelism, queue back-pressure, transport polling, and shutdown.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of worker tasks draining the operation queue.
    pub worker_count: usize,
    /// Capacity of the bounded operation queue. Producers wait when it is full.
    pub queue_capacity: usize,
    /// Largest batch requested from the transport per poll.
    pub max_messages_per_poll: usize,
    /// How long a single poll may wait for the first message.
    pub wait_time: Duration,
    /// Pause after a failed poll before trying again.
    pub poll_error_backoff: Duration,
    /// How long shutdown waits for in-flight operations.
    pub drain_timeout: Duration,
}

impl ServerConfig {
    /// Clamps counts that must be at least one and waits that must be at
    /// least [`MIN_POLL_WAIT`].
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.worker_count = self.worker_count.max(1);
        self.queue_capacity = self.queue_capacity.max(1);
        self.max_messages_per_poll = self.max_messages_per_poll.max(1);
        self.wait_time = self.wait_time.max(MIN_POLL_WAIT);
        self.poll_error_backoff = self.poll_error_backoff.max(MIN_POLL_WAIT);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_messages_per_poll: 10,
            wait_time: Duration::from_secs(1),
            poll_error_backoff: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(30),
        }
    }
}
