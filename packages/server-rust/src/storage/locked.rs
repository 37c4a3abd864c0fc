//! Reader/writer-locked [`ItemStore`] over [`OrderedKeyedStore`].
//!
//! Reads (`get`, `get_all`, `iterate`, `len`) share the lock and run in
//! parallel with each other; `add` and `remove` take it exclusively. Reads
//! take the lock recursively, so they never queue behind a waiting writer
//! and an `iterate` consumer may read the store it is visiting. Items
//! are copied out while the lock is held, so nothing escapes that could
//! observe a later write.

use ordkv_core::{Item, OrderedKeyedStore, StoreError};
use parking_lot::RwLock;

use super::engine::ItemStore;

/// [`ItemStore`] guarding one [`OrderedKeyedStore`] with a single `RwLock`.
#[derive(Debug, Default)]
pub struct RwLockedStore {
    inner: RwLock<OrderedKeyedStore>,
}

impl RwLockedStore {
    /// Wraps an existing store.
    #[must_use]
    pub fn new(store: OrderedKeyedStore) -> Self {
        Self {
            inner: RwLock::new(store),
        }
    }

    /// Unwraps the underlying store.
    #[must_use]
    pub fn into_inner(self) -> OrderedKeyedStore {
        self.inner.into_inner()
    }
}

impl ItemStore for RwLockedStore {
    fn add(&self, item: Item) -> Option<Item> {
        self.inner.write().add(item)
    }

    fn remove(&self, key: &str) -> Result<Item, StoreError> {
        self.inner.write().remove(key)
    }

    fn get(&self, key: &str) -> Result<Item, StoreError> {
        self.inner.read_recursive().get(key)
    }

    fn get_all(&self) -> Vec<Item> {
        self.inner.read_recursive().get_all()
    }

    fn iterate(&self, consumer: &mut dyn FnMut(&Item)) {
        self.inner.read_recursive().iterate(consumer);
    }

    fn len(&self) -> usize {
        self.inner.read_recursive().len()
    }
}
