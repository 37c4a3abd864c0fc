//! Append-only text journal of processed operations.
//!
//! Each processed operation writes its name on one line, followed by
//! operation-specific detail lines (`key:value` pairs, or the removed key).
//! An entry is written as a unit and the writer is flushed after it. Write failures are logged and
//! otherwise ignored: the journal must never stall or stop a worker.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use ordkv_core::Item;
use parking_lot::Mutex;
use tracing::warn;

/// Shared journal writer. Entries from concurrent workers are serialised by
/// an internal mutex, one whole entry at a time.
pub struct OperationJournal {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl OperationJournal {
    /// Opens (or creates) `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(file))
    }

    /// Journals into an arbitrary writer.
    #[must_use]
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Appends one entry, each element on its own line.
    ///
    /// The whole entry is written under one lock acquisition and flushed
    /// once, so entries from concurrent workers never interleave.
    pub fn record_entry<S: AsRef<str>>(&self, lines: &[S]) {
        let mut writer = self.writer.lock();
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(writer, "{}", line.as_ref()))
            .and_then(|()| writer.flush());
        if let Err(e) = result {
            warn!("error writing journal: {e}");
        }
    }

    /// Appends a single line.
    pub fn record(&self, line: &str) {
        self.record_entry(&[line]);
    }
}

/// `key:value` detail line for `item`.
pub(crate) fn item_line(item: &Item) -> String {
    format!("{}:{}", item.key, item.value)
}

impl std::fmt::Debug for OperationJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationJournal").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn appends_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let journal = OperationJournal::create(&path).unwrap();
        journal.record_entry(&["Add".to_string(), item_line(&Item::new("1", "A"))]);
        drop(journal);

        // Reopening appends instead of truncating.
        let journal = OperationJournal::create(&path).unwrap();
        journal.record("GetAll");
        drop(journal);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Add\n1:A\nGetAll\n");
    }

    #[test]
    fn write_errors_are_swallowed() {
        let journal = OperationJournal::from_writer(FailingWriter);
        journal.record("Add");
    }
}
