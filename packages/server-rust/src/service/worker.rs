//! Pool of workers competing for operations on the shared queue.
//!
//! Each worker is a tokio task running one sequential loop:
//! 1. Wait for the next operation or the shutdown signal, whichever is first
//! 2. On shutdown, stop; operations still queued are abandoned
//! 3. Otherwise apply the operation through its `OperationProcessor`
//!
//! Operations taken by different workers may be applied in any relative order.
//! Operations taken by the same worker are applied in the order it took them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};

use super::processor::OperationProcessor;
use super::queue::OperationReceiver;
use super::shutdown::{wait_for_shutdown, ShutdownController};

/// Summary returned once the pool has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    /// Whether every in-flight operation finished before the drain timeout.
    pub drained: bool,
    /// Total operations applied across all workers.
    pub applied: u64,
}

/// A fixed set of worker tasks draining one [`OperationReceiver`].
pub struct WorkerPool {
    shutdown: Arc<ShutdownController>,
    workers: Vec<(String, JoinHandle<u64>)>,
    drain_timeout: Duration,
}

impl WorkerPool {
    /// Spawns `worker_count` workers on the current tokio runtime.
    ///
    /// `make_processor` is called once per worker with its 1-based index.
    pub fn start<F>(
        worker_count: usize,
        queue: &OperationReceiver,
        shutdown: Arc<ShutdownController>,
        drain_timeout: Duration,
        mut make_processor: F,
    ) -> Self
    where
        F: FnMut(usize) -> OperationProcessor,
    {
        let workers = (1..=worker_count)
            .map(|id| {
                let processor = make_processor(id);
                let name = processor.name().to_string();
                let span = info_span!("worker", name = %name);
                let handle = tokio::spawn(
                    run_worker(processor, queue.clone(), Arc::clone(&shutdown)).instrument(span),
                );
                (name, handle)
            })
            .collect();

        info!(worker_count, "worker pool started");

        Self {
            shutdown,
            workers,
            drain_timeout,
        }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Signals shutdown, waits for in-flight operations, and joins all workers.
    pub async fn shutdown(self) -> PoolReport {
        self.shutdown.trigger_shutdown();
        self.join().await
    }

    /// Waits for the workers to stop after shutdown was signalled elsewhere
    /// (or after the queue closed).
    pub async fn join(self) -> PoolReport {
        let mut applied = 0;
        for (name, handle) in self.workers {
            match handle.await {
                Ok(count) => applied += count,
                Err(e) => error!(worker = %name, "worker task failed: {e}"),
            }
        }

        let drained = self.shutdown.wait_for_drain(self.drain_timeout).await;
        if drained {
            info!(applied, "worker pool stopped");
        } else {
            error!(
                in_flight = self.shutdown.in_flight_count(),
                "worker pool drain timed out"
            );
        }

        PoolReport { drained, applied }
    }
}

/// One worker loop. Returns the number of operations it applied.
async fn run_worker(
    processor: OperationProcessor,
    queue: OperationReceiver,
    shutdown: Arc<ShutdownController>,
) -> u64 {
    let mut signal = shutdown.shutdown_receiver();
    let mut applied = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            () = wait_for_shutdown(&mut signal) => break,
            op = queue.recv() => op,
        };

        let Some(op) = next else {
            info!("operation queue closed");
            break;
        };

        // The guard is taken before the final shutdown check, so a concurrent
        // drain either sees this operation in flight or we see the signal.
        let _in_flight = shutdown.in_flight_guard();
        if shutdown.is_shutdown_triggered() {
            debug!(operation = op.name(), "shutdown observed, abandoning dequeued operation");
            break;
        }

        processor.process(op);
        applied += 1;
    }

    info!(applied, "shutting down worker");
    applied
}

#[cfg(test)]
mod tests {
    use ordkv_core::{Item, Operation};

    use super::*;
    use crate::service::queue::OperationQueue;
    use crate::service::shutdown::LifecycleState;
    use crate::storage::{ItemStore, RwLockedStore};

    fn start_pool(
        workers: usize,
        queue: &OperationReceiver,
    ) -> (WorkerPool, Arc<RwLockedStore>, Arc<ShutdownController>) {
        let store = Arc::new(RwLockedStore::default());
        let shutdown = Arc::new(ShutdownController::new());
        let pool_store: Arc<dyn ItemStore> = store.clone();
        let pool = WorkerPool::start(
            workers,
            queue,
            Arc::clone(&shutdown),
            Duration::from_secs(1),
            |id| OperationProcessor::new(format!("worker-{id}"), Arc::clone(&pool_store), None),
        );
        (pool, store, shutdown)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition reached in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn workers_apply_all_distinct_adds() {
        let (tx, rx) = OperationQueue::bounded(16);
        let (pool, store, _shutdown) = start_pool(4, &rx);
        assert_eq!(pool.worker_count(), 4);

        for i in 0..200 {
            tx.send(Operation::add(i.to_string(), format!("v{i}")))
                .await
                .unwrap();
        }
        wait_until(|| store.len() == 200).await;

        let report = pool.shutdown().await;
        assert!(report.drained);
        assert_eq!(report.applied, 200);

        let mut keys: Vec<u32> = store
            .get_all()
            .iter()
            .map(|i| i.key.parse().unwrap())
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn single_worker_applies_in_queue_order() {
        let (tx, rx) = OperationQueue::bounded(8);
        let (pool, store, _shutdown) = start_pool(1, &rx);

        tx.send(Operation::add("1", "A")).await.unwrap();
        tx.send(Operation::add("2", "B")).await.unwrap();
        tx.send(Operation::add("1", "C")).await.unwrap();
        tx.send(Operation::remove("missing")).await.unwrap();
        tx.send(Operation::GetAll).await.unwrap();
        drop(tx);

        let report = pool.join().await;
        assert_eq!(report.applied, 5);
        assert_eq!(store.get_all(), vec![Item::new("2", "B"), Item::new("1", "C")]);
    }

    #[tokio::test]
    async fn queued_operations_are_abandoned_after_shutdown() {
        let (tx, rx) = OperationQueue::bounded(8);
        let store = Arc::new(RwLockedStore::default());
        let shutdown = Arc::new(ShutdownController::new());

        // Signal before any worker runs: nothing queued may be applied.
        shutdown.trigger_shutdown();
        for i in 0..5 {
            tx.send(Operation::add(i.to_string(), "x")).await.unwrap();
        }

        let pool_store: Arc<dyn ItemStore> = store.clone();
        let pool = WorkerPool::start(
            3,
            &rx,
            Arc::clone(&shutdown),
            Duration::from_secs(1),
            |id| OperationProcessor::new(format!("worker-{id}"), Arc::clone(&pool_store), None),
        );

        let report = pool.join().await;
        assert_eq!(report.applied, 0);
        assert!(report.drained);
        assert!(store.is_empty());
        assert_eq!(tx.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_operations_applied_after_shutdown_returns() {
        let (tx, rx) = OperationQueue::bounded(64);
        let (pool, store, shutdown) = start_pool(2, &rx);

        tx.send(Operation::add("before", "1")).await.unwrap();
        wait_until(|| store.len() == 1).await;

        let report = pool.shutdown().await;
        assert!(report.drained);
        assert_eq!(shutdown.state(), LifecycleState::Stopped);

        for i in 0..10 {
            tx.send(Operation::add(format!("after-{i}"), "x")).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get_all(), vec![Item::new("before", "1")]);
    }

    /// Store whose `add` parks on a barrier until the test releases it.
    struct GatedStore {
        inner: RwLockedStore,
        entered: std::sync::Barrier,
        release: std::sync::Barrier,
    }

    impl ItemStore for GatedStore {
        fn add(&self, item: Item) -> Option<Item> {
            self.entered.wait();
            self.release.wait();
            self.inner.add(item)
        }

        fn remove(&self, key: &str) -> Result<Item, ordkv_core::StoreError> {
            self.inner.remove(key)
        }

        fn get(&self, key: &str) -> Result<Item, ordkv_core::StoreError> {
            self.inner.get(key)
        }

        fn get_all(&self) -> Vec<Item> {
            self.inner.get_all()
        }

        fn iterate(&self, consumer: &mut dyn FnMut(&Item)) {
            self.inner.iterate(consumer);
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_lets_a_started_operation_finish() {
        let (tx, rx) = OperationQueue::bounded(4);
        let store = Arc::new(GatedStore {
            inner: RwLockedStore::default(),
            entered: std::sync::Barrier::new(2),
            release: std::sync::Barrier::new(2),
        });
        let shutdown = Arc::new(ShutdownController::new());
        let pool_store: Arc<dyn ItemStore> = store.clone();
        let pool = WorkerPool::start(
            1,
            &rx,
            Arc::clone(&shutdown),
            Duration::from_secs(5),
            |id| OperationProcessor::new(format!("worker-{id}"), Arc::clone(&pool_store), None),
        );

        tx.send(Operation::add("slow", "1")).await.unwrap();
        {
            let store = Arc::clone(&store);
            tokio::task::spawn_blocking(move || store.entered.wait())
                .await
                .unwrap();
        }

        // The add is now running inside the worker.
        let stopping = tokio::spawn(pool.shutdown());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(shutdown.is_shutdown_triggered());
        assert_eq!(shutdown.in_flight_count(), 1);
        assert!(!stopping.is_finished());

        {
            let store = Arc::clone(&store);
            tokio::task::spawn_blocking(move || store.release.wait())
                .await
                .unwrap();
        }
        let report = stopping.await.unwrap();

        assert_eq!(report.applied, 1);
        assert!(report.drained);
        assert_eq!(shutdown.state(), LifecycleState::Stopped);
        assert_eq!(store.get("slow"), Ok(Item::new("slow", "1")));
    }
}
