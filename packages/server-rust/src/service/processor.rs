//! Applies one decoded [`Operation`] to the shared store.
//!
//! Results are only observable as log lines (and journal entries): the
//! protocol has no reply channel. A `NotFound` from the store is a warning,
//! never an error that stops the caller.

use std::sync::Arc;
use std::time::Instant;

use ordkv_core::{Item, Operation, StoreError};
use tracing::{info, info_span, warn};

use super::journal::{item_line, OperationJournal};
use crate::storage::ItemStore;

/// What applying an operation did to, or found in, the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The item was stored; `replaced` is true if the key already existed.
    Added { replaced: bool },
    Removed(Item),
    Retrieved(Item),
    Listed(Vec<Item>),
    /// `Remove` or `Get` referenced an absent key.
    NotFound { key: String },
}

impl ProcessOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            _ => "ok",
        }
    }
}

/// Per-worker operation handler bound to the shared store.
#[derive(Clone)]
pub struct OperationProcessor {
    name: String,
    store: Arc<dyn ItemStore>,
    journal: Option<Arc<OperationJournal>>,
}

impl OperationProcessor {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn ItemStore>,
        journal: Option<Arc<OperationJournal>>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            journal,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies `op` to the store, logging and journaling the result.
    pub fn process(&self, op: Operation) -> ProcessOutcome {
        let operation = op.name();
        let span = info_span!(
            "operation",
            operation,
            outcome = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );
        let _entered = span.enter();
        let start = Instant::now();

        let mut entry = vec![operation.to_string()];
        let outcome = match op {
            Operation::Add(item) => self.add(item, &mut entry),
            Operation::Remove { key } => self.remove(key, &mut entry),
            Operation::Get { key } => self.get(key, &mut entry),
            Operation::GetAll => self.get_all(&mut entry),
        };
        if let Some(journal) = &self.journal {
            journal.record_entry(&entry);
        }

        #[allow(clippy::cast_possible_truncation)]
        let duration_us = start.elapsed().as_micros() as u64;
        span.record("outcome", outcome.label());
        span.record("duration_us", duration_us);

        outcome
    }

    fn add(&self, item: Item, entry: &mut Vec<String>) -> ProcessOutcome {
        info!(
            worker = %self.name,
            key = %item.key,
            value = %item.value,
            "adding item"
        );
        entry.push(item_line(&item));
        let replaced = self.store.add(item).is_some();
        ProcessOutcome::Added { replaced }
    }

    fn remove(&self, key: String, entry: &mut Vec<String>) -> ProcessOutcome {
        match self.store.remove(&key) {
            Ok(item) => {
                info!(worker = %self.name, key = %key, "removing item");
                entry.push(key);
                ProcessOutcome::Removed(item)
            }
            Err(StoreError::NotFound { key }) => {
                warn!(worker = %self.name, key = %key, "can't remove item: key not found");
                ProcessOutcome::NotFound { key }
            }
        }
    }

    fn get(&self, key: String, entry: &mut Vec<String>) -> ProcessOutcome {
        match self.store.get(&key) {
            Ok(item) => {
                info!(worker = %self.name, "Get({}): {}", item.key, item.value);
                entry.push(item_line(&item));
                ProcessOutcome::Retrieved(item)
            }
            Err(StoreError::NotFound { key }) => {
                warn!(worker = %self.name, key = %key, "can't get item: key not found");
                ProcessOutcome::NotFound { key }
            }
        }
    }

    fn get_all(&self, entry: &mut Vec<String>) -> ProcessOutcome {
        let items = self.store.get_all();
        info!(worker = %self.name, count = items.len(), "listing all items:");
        for item in &items {
            info!(worker = %self.name, "{item}");
            entry.push(item_line(item));
        }
        ProcessOutcome::Listed(items)
    }
}

impl std::fmt::Debug for OperationProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationProcessor")
            .field("name", &self.name)
            .field("journal", &self.journal.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use parking_lot::Mutex;

    use super::*;
    use crate::storage::RwLockedStore;

    /// Writer whose contents stay readable after being moved into a journal.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn processor() -> (OperationProcessor, Arc<RwLockedStore>) {
        let store = Arc::new(RwLockedStore::default());
        let processor = OperationProcessor::new("worker-1", store.clone(), None);
        (processor, store)
    }

    #[test]
    fn add_then_update_reports_replacement() {
        let (processor, store) = processor();
        assert_eq!(
            processor.process(Operation::add("1", "A")),
            ProcessOutcome::Added { replaced: false }
        );
        assert_eq!(
            processor.process(Operation::add("1", "B")),
            ProcessOutcome::Added { replaced: true }
        );
        assert_eq!(store.get_all(), vec![Item::new("1", "B")]);
    }

    #[test]
    fn remove_missing_key_is_not_fatal() {
        let (processor, store) = processor();
        processor.process(Operation::add("1", "A"));

        assert_eq!(
            processor.process(Operation::remove("2")),
            ProcessOutcome::NotFound {
                key: "2".to_string()
            }
        );
        assert_eq!(
            processor.process(Operation::remove("1")),
            ProcessOutcome::Removed(Item::new("1", "A"))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn get_reports_value_or_not_found() {
        let (processor, _store) = processor();
        processor.process(Operation::add("k", "v"));

        assert_eq!(
            processor.process(Operation::get("k")),
            ProcessOutcome::Retrieved(Item::new("k", "v"))
        );
        assert!(matches!(
            processor.process(Operation::get("missing")),
            ProcessOutcome::NotFound { .. }
        ));
    }

    #[test]
    fn get_all_lists_in_store_order() {
        let (processor, _store) = processor();
        for (k, v) in [("1", "A"), ("2", "B"), ("1", "C")] {
            processor.process(Operation::add(k, v));
        }
        assert_eq!(
            processor.process(Operation::GetAll),
            ProcessOutcome::Listed(vec![Item::new("2", "B"), Item::new("1", "C")])
        );
    }

    #[test]
    fn journal_records_operations_and_results() {
        let buffer = SharedBuffer::default();
        let journal = Arc::new(OperationJournal::from_writer(buffer.clone()));
        let store = Arc::new(RwLockedStore::default());
        let processor = OperationProcessor::new("worker-1", store, Some(journal));

        processor.process(Operation::add("1", "A"));
        processor.process(Operation::add("2", "B"));
        processor.process(Operation::get("1"));
        processor.process(Operation::remove("9"));
        processor.process(Operation::remove("1"));
        processor.process(Operation::GetAll);

        assert_eq!(
            buffer.lines(),
            vec![
                "Add", "1:A", "Add", "2:B", "Get", "1:A", "Remove", "Remove", "1", "GetAll",
                "2:B",
            ]
        );
    }

    #[test]
    fn concurrent_workers_never_split_journal_entries() {
        const WORKERS: usize = 8;
        const PER_WORKER: usize = 500;

        let buffer = SharedBuffer::default();
        let journal = Arc::new(OperationJournal::from_writer(buffer.clone()));
        let store: Arc<dyn ItemStore> = Arc::new(RwLockedStore::default());

        let handles: Vec<_> = (0..WORKERS)
            .map(|w| {
                let processor = OperationProcessor::new(
                    format!("worker-{w}"),
                    Arc::clone(&store),
                    Some(Arc::clone(&journal)),
                );
                std::thread::spawn(move || {
                    for i in 0..PER_WORKER {
                        processor.process(Operation::add(format!("{w}-{i}"), "v"));
                        if i % 50 == 0 {
                            processor.process(Operation::GetAll);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every entry is a name line followed only by detail lines.
        let lines = buffer.lines();
        let mut adds = 0;
        let mut cursor = lines.iter().peekable();
        while let Some(name) = cursor.next() {
            match name.as_str() {
                "Add" => {
                    let detail = cursor.next().expect("Add has a detail line");
                    assert!(detail.ends_with(":v"), "unexpected detail {detail:?}");
                    adds += 1;
                }
                "GetAll" => {
                    while cursor.peek().is_some_and(|l| l.contains(':')) {
                        cursor.next();
                    }
                }
                other => panic!("entry starts with {other:?}"),
            }
        }
        assert_eq!(adds, WORKERS * PER_WORKER);
    }
}
