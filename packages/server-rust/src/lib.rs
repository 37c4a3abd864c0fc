//! `ordkv` Server: queue-driven worker pool over a shared ordered store.

pub mod client;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod traits;
pub mod transport;

pub use service::{ServerConfig, ServiceModule};
pub use storage::{ItemStore, RwLockedStore};
pub use traits::{MessageSink, MessageSource, RawMessage, TransportError};
