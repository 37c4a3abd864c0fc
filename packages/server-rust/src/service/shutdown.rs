//! Cooperative cancellation shared by the dispatcher and every worker.
//!
//! One `watch` channel carries the stop flag. Workers wrap each store access
//! in an [`InFlightGuard`]; the last guard to drop wakes anyone waiting in
//! [`ShutdownController::wait_for_drain`]. The lifecycle state is readable
//! without locking through an `ArcSwap`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{watch, Notify};

/// Where the pipeline is in its life.
///
/// `Starting -> Running -> Draining -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Components are being wired; nothing consumes the queue yet.
    Starting,
    Running,
    /// Stop was signalled; operations already touching the store finish.
    Draining,
    /// Nothing is in flight any more.
    Stopped,
}

#[derive(Debug, Default)]
struct InFlight {
    count: AtomicU64,
    idle: Notify,
}

/// Stop signal plus a count of operations currently being applied.
#[derive(Debug)]
pub struct ShutdownController {
    stop: watch::Sender<bool>,
    in_flight: Arc<InFlight>,
    state: ArcSwap<LifecycleState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stop: watch::channel(false).0,
            in_flight: Arc::new(InFlight::default()),
            state: ArcSwap::from_pointee(LifecycleState::Starting),
        }
    }

    pub fn set_running(&self) {
        self.state.store(Arc::new(LifecycleState::Running));
    }

    /// A receiver to race against every suspension point with
    /// [`wait_for_shutdown`].
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    /// Raises the stop flag and moves to `Draining`.
    ///
    /// Calling it again is harmless and never moves a `Stopped` controller
    /// back to `Draining`.
    pub fn trigger_shutdown(&self) {
        if self.state() != LifecycleState::Stopped {
            self.state.store(Arc::new(LifecycleState::Draining));
        }
        // Stores the flag even with no receivers, so later subscribers see it.
        self.stop.send_replace(true);
    }

    #[must_use]
    pub fn is_shutdown_triggered(&self) -> bool {
        *self.stop.borrow()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// Counts one operation as in flight until the returned guard drops,
    /// unwinding included.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Waits up to `timeout` for the in-flight count to reach zero.
    ///
    /// On success the state becomes `Stopped` and `true` is returned. On
    /// timeout the state is left as it was and `false` is returned.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let idle = async {
            loop {
                // Subscribe before reading the count so the final guard's
                // wake-up cannot slip in between.
                let woken = self.in_flight.idle.notified();
                if self.in_flight_count() == 0 {
                    return;
                }
                woken.await;
            }
        };

        let drained = tokio::time::timeout(timeout, idle).await.is_ok();
        if drained {
            self.state.store(Arc::new(LifecycleState::Stopped));
        }
        drained
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps one operation counted as in flight while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}

/// Resolves once the stop flag is raised, immediately if it already is.
/// A dropped controller counts as stopped.
pub async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    let _ = signal.wait_for(|stopped| *stopped).await;
}
