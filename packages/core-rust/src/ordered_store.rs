//! Insertion-ordered keyed store with move-to-tail on update.
//!
//! [`OrderedKeyedStore`] combines a hash index (key -> slot) with a doubly
//! linked order threaded through an arena of slots. Slots are addressed by
//! stable `usize` indices; vacated slots are chained into a free list and
//! reused by later insertions.
//!
//! # Ordering
//!
//! Items are kept in the order they were last written. Adding a key that is
//! already present removes the old entry and appends the new one at the tail,
//! so an update always moves the key to the most-recent position:
//!
//! ```
//! use ordkv_core::{Item, OrderedKeyedStore};
//!
//! let mut store = OrderedKeyedStore::new();
//! store.add(Item::new("1", "A"));
//! store.add(Item::new("2", "B"));
//! store.add(Item::new("1", "C"));
//!
//! assert_eq!(store.get_all(), vec![Item::new("2", "B"), Item::new("1", "C")]);
//! ```
//!
//! # Complexity
//!
//! `add`, `remove`, and `get` run in expected O(1). `get_all` and iteration
//! are O(n) in the number of stored items.

use std::iter::FusedIterator;

use ahash::AHashMap;

use crate::types::Item;

/// Errors returned by keyed lookups against the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("key `{key}' not found")]
    NotFound { key: String },
}

impl StoreError {
    fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }
}

#[derive(Debug)]
struct Node {
    item: Item,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
enum Slot {
    Occupied(Node),
    Vacant { next_free: Option<usize> },
}

/// Unique-keyed mapping with a total insertion order.
///
/// Not synchronised: wrap it in a lock (see `RwLockedStore` in the server
/// crate) before sharing across threads.
#[derive(Debug, Default)]
pub struct OrderedKeyedStore {
    slots: Vec<Slot>,
    index: AHashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Option<usize>,
}

impl OrderedKeyedStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` items before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: AHashMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Number of items currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Appends `item` at the tail of the order.
    ///
    /// If the key is already present its entry is unlinked first, so the key
    /// ends up in the most-recent position carrying the new value. Returns the
    /// replaced item, if any.
    pub fn add(&mut self, item: Item) -> Option<Item> {
        let replaced = self
            .index
            .remove(item.key.as_str())
            .map(|idx| self.unlink(idx));

        let key = item.key.clone();
        let idx = self.push_back(item);
        self.index.insert(key, idx);

        debug_assert!(self.tail == Some(idx));
        replaced
    }

    /// Removes the entry for `key` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key is absent. The store is
    /// left untouched in that case.
    pub fn remove(&mut self, key: &str) -> Result<Item, StoreError> {
        let idx = self
            .index
            .remove(key)
            .ok_or_else(|| StoreError::not_found(key))?;
        let item = self.unlink(idx);
        debug_assert_eq!(self.head.is_none(), self.index.is_empty());
        Ok(item)
    }

    /// Returns a copy of the item stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key is absent.
    pub fn get(&self, key: &str) -> Result<Item, StoreError> {
        self.index
            .get(key)
            .map(|&idx| self.node(idx).item.clone())
            .ok_or_else(|| StoreError::not_found(key))
    }

    /// Returns copies of all items in current order.
    ///
    /// The result is freshly allocated; later mutations of the store are not
    /// visible through it.
    #[must_use]
    pub fn get_all(&self) -> Vec<Item> {
        let items: Vec<Item> = self.iter().cloned().collect();
        debug_assert_eq!(items.len(), self.len());
        items
    }

    /// Calls `consumer` for every item, front to back, without copying.
    ///
    /// The consumer borrows the store, so it cannot mutate it. It should not
    /// block either: shared wrappers hold their read lock for the whole call.
    pub fn iterate<F>(&self, mut consumer: F)
    where
        F: FnMut(&Item),
    {
        for item in self {
            consumer(item);
        }
    }

    /// Borrowing iterator over items in current order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            store: self,
            cursor: self.head,
            remaining: self.len(),
        }
    }

    /// Walks the whole structure and panics if the index and the linked order
    /// disagree. O(n); meant for tests and debugging.
    ///
    /// # Panics
    ///
    /// Panics on any inconsistency between index, order, and free list.
    pub fn assert_consistent(&self) {
        let mut seen = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx);
            assert_eq!(node.prev, prev, "broken back link at slot {idx}");
            assert_eq!(
                self.index.get(node.item.key.as_str()),
                Some(&idx),
                "index does not point at slot {idx} for key {}",
                node.item.key
            );
            seen += 1;
            prev = Some(idx);
            cursor = node.next;
        }
        assert_eq!(self.tail, prev, "tail does not match last linked slot");
        assert_eq!(seen, self.index.len(), "order and index sizes differ");

        let mut vacant = 0usize;
        let mut free = self.free;
        while let Some(idx) = free {
            match &self.slots[idx] {
                Slot::Vacant { next_free } => free = *next_free,
                Slot::Occupied(_) => panic!("free list reaches occupied slot {idx}"),
            }
            vacant += 1;
        }
        assert_eq!(seen + vacant, self.slots.len(), "leaked slots");
    }

    // -----------------------------------------------------------------------
    // Arena plumbing
    // -----------------------------------------------------------------------

    fn node(&self, idx: usize) -> &Node {
        match &self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("ordered store: slot {idx} is vacant but still linked"),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        match &mut self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("ordered store: slot {idx} is vacant but still linked"),
        }
    }

    fn allocate(&mut self, node: Node) -> usize {
        if let Some(idx) = self.free {
            self.free = match self.slots[idx] {
                Slot::Vacant { next_free } => next_free,
                Slot::Occupied(_) => panic!("ordered store: free list points at occupied slot {idx}"),
            };
            self.slots[idx] = Slot::Occupied(node);
            idx
        } else {
            self.slots.push(Slot::Occupied(node));
            self.slots.len() - 1
        }
    }

    fn release(&mut self, idx: usize) -> Node {
        let vacant = Slot::Vacant {
            next_free: self.free,
        };
        match std::mem::replace(&mut self.slots[idx], vacant) {
            Slot::Occupied(node) => {
                self.free = Some(idx);
                node
            }
            Slot::Vacant { .. } => panic!("ordered store: slot {idx} released twice"),
        }
    }

    fn push_back(&mut self, item: Item) -> usize {
        let idx = self.allocate(Node {
            item,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        idx
    }

    /// Detaches the slot from the order and returns it to the free list.
    /// The caller is responsible for the index entry.
    fn unlink(&mut self, idx: usize) -> Item {
        let node = self.release(idx);
        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        node.item
    }
}

/// Iterator over a store's items in order. Created by [`OrderedKeyedStore::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    store: &'a OrderedKeyedStore,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.store.node(idx);
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a OrderedKeyedStore {
    type Item = &'a Item;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
