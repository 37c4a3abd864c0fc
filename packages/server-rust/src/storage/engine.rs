//! Store trait shared by workers.
//!
//! Defines [`ItemStore`], the interface every worker holds as
//! `Arc<dyn ItemStore>`. All methods take `&self`; implementations provide
//! their own synchronisation.

use ordkv_core::{Item, StoreError};

/// Ordered key/value storage safe to share across worker tasks.
///
/// Each call is individually atomic: no caller ever observes a
/// half-applied write. There is no cross-call atomicity, so a `get` racing a
/// `remove` on another worker may see either outcome.
pub trait ItemStore: Send + Sync + 'static {
    /// Insert `item`, moving its key to the tail if it already exists.
    /// Returns the replaced item, if any.
    fn add(&self, item: Item) -> Option<Item>;

    /// Remove and return the item under `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the key is absent; the store is unchanged.
    fn remove(&self, key: &str) -> Result<Item, StoreError>;

    /// Copy of the item under `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the key is absent.
    fn get(&self, key: &str) -> Result<Item, StoreError>;

    /// Point-in-time copy of all items in order.
    fn get_all(&self) -> Vec<Item>;

    /// Visit every item in order without copying.
    ///
    /// The consumer runs while the store is locked for reading. It may read
    /// the store again, but must not block or write to it.
    fn iterate(&self, consumer: &mut dyn FnMut(&Item));

    /// Number of items currently stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
