//! Operation pipeline: dispatch, queueing, and concurrent application.
//!
//! 1. **Dispatcher** (`dispatcher`): transport message -> decoded `Operation`
//! 2. **Queue** (`queue`): bounded hand-off between dispatcher and workers
//! 3. **Workers** (`worker`): competing consumers applying operations
//! 4. **Processor** (`processor`): per-operation store access and logging
//! 5. **Module** (`module`): wires the above together and runs it

pub mod config;
pub mod dispatcher;
pub mod journal;
pub mod module;
pub mod processor;
pub mod queue;
pub mod shutdown;
pub mod worker;

// Re-export key types for convenient access.
pub use config::ServerConfig;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use journal::OperationJournal;
pub use module::{ServeReport, ServiceModule};
pub use processor::{OperationProcessor, ProcessOutcome};
pub use queue::{OperationQueue, OperationReceiver, OperationSender, QueueClosed};
pub use shutdown::{InFlightGuard, LifecycleState, ShutdownController};
pub use worker::{PoolReport, WorkerPool};
