//! Service module wiring the store, queue, workers and dispatcher together.
//!
//! Follows a deferred startup pattern: `new()` allocates the shared state
//! (store and shutdown controller) so callers can hold on to it, and
//! `serve()` starts the pipeline and runs it until the shutdown future
//! resolves.

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use super::config::ServerConfig;
use super::dispatcher::{DispatchStats, Dispatcher};
use super::journal::OperationJournal;
use super::processor::OperationProcessor;
use super::queue::OperationQueue;
use super::shutdown::ShutdownController;
use super::worker::{PoolReport, WorkerPool};
use crate::storage::{ItemStore, RwLockedStore};
use crate::traits::MessageSource;

/// What one [`ServiceModule::serve`] run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeReport {
    pub dispatch: DispatchStats,
    pub pool: PoolReport,
}

/// Owns the shared store and runs the dispatch/worker pipeline.
pub struct ServiceModule {
    config: ServerConfig,
    store: Arc<RwLockedStore>,
    shutdown: Arc<ShutdownController>,
    journal: Option<Arc<OperationJournal>>,
}

impl ServiceModule {
    /// Creates the module with an empty store. Nothing runs until `serve()`.
    #[must_use]
    pub fn new(config: ServerConfig, journal: Option<OperationJournal>) -> Self {
        Self {
            config: config.normalized(),
            store: Arc::new(RwLockedStore::default()),
            shutdown: Arc::new(ShutdownController::new()),
            journal: journal.map(Arc::new),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns a shared handle to the store the workers mutate.
    #[must_use]
    pub fn store(&self) -> Arc<RwLockedStore> {
        Arc::clone(&self.store)
    }

    /// Returns a shared reference to the shutdown controller.
    ///
    /// Triggering it has the same effect as resolving the `serve()` future.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Runs the pipeline until `shutdown` resolves.
    ///
    /// 1. Creates the bounded operation queue
    /// 2. Starts `worker_count` workers on it
    /// 3. Reads from `source` until shutdown, feeding the queue
    /// 4. Stops the workers and waits for in-flight operations
    ///
    /// Operations still queued at shutdown are abandoned.
    pub async fn serve(
        self,
        source: Arc<dyn MessageSource>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServeReport {
        let config = self.config;
        let (sender, receiver) = OperationQueue::bounded(config.queue_capacity);

        let store: Arc<dyn ItemStore> = self.store;
        let journal = self.journal;
        let pool = WorkerPool::start(
            config.worker_count,
            &receiver,
            Arc::clone(&self.shutdown),
            config.drain_timeout,
            |id| OperationProcessor::new(format!("worker-{id}"), Arc::clone(&store), journal.clone()),
        );
        drop(receiver);

        let dispatcher = Dispatcher::new(Arc::clone(&source), sender, &config);
        self.shutdown.set_running();
        info!("waiting for messages on {}", source.describe());

        let trigger = {
            let controller = Arc::clone(&self.shutdown);
            tokio::spawn(async move {
                shutdown.await;
                info!("shutdown signal received");
                controller.trigger_shutdown();
            })
        };

        let dispatch = dispatcher.run(&self.shutdown).await;
        let pool = pool.shutdown().await;
        trigger.abort();

        ServeReport { dispatch, pool }
    }
}
