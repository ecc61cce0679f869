//! In-memory log store for testing.

use crate::chunks::LogChunks;
use crate::error::StorageResult;
use crate::store::LogStore;
use parking_lot::RwLock;
use std::io::Cursor;
use std::sync::Arc;

/// An in-memory log.
///
/// Clones share the same underlying buffer, so a test can hand one clone
/// to a server and inspect the log through another.
///
/// # Example
///
/// ```rust
/// use recordlog_storage::{InMemoryLog, LogStore};
///
/// let mut log = InMemoryLog::new();
/// let observer = log.clone();
/// log.append(b"test\n").unwrap();
/// assert_eq!(observer.data(), b"test\n");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryLog {
    data: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryLog {
    /// Creates a new empty in-memory log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory log with pre-existing content.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of the log content.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl LogStore for InMemoryLog {
    type Reader = Cursor<Vec<u8>>;

    fn append(&mut self, data: &[u8]) -> StorageResult<usize> {
        self.data.write().extend_from_slice(data);
        Ok(data.len())
    }

    fn read_all(&self) -> StorageResult<LogChunks<Self::Reader>> {
        Ok(LogChunks::new(Cursor::new(self.data())))
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn destroy(&mut self) -> StorageResult<()> {
        self.data.write().clear();
        Ok(())
    }
}
