//! Shared store layer for the `ordkv` server.
//!
//! - [`ItemStore`]: the object-safe seam workers apply operations through
//! - [`RwLockedStore`]: the reader/writer-locked wrapper around
//!   [`OrderedKeyedStore`](ordkv_core::OrderedKeyedStore)

pub mod engine;
pub mod locked;

pub use engine::*;
pub use locked::*;
