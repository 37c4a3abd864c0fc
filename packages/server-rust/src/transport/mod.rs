//! [`MessageSource`](crate::traits::MessageSource) and
//! [`MessageSink`](crate::traits::MessageSink) implementations.
//!
//! - [`InMemoryQueue`]: in-process queue with at-least-once semantics, for
//!   tests and embedding
//! - [`LineSource`] / [`LineSink`]: newline-delimited JSON records over
//!   stdin/stdout or files

pub mod lines;
pub mod memory;

pub use lines::{LineSink, LineSource};
pub use memory::InMemoryQueue;
