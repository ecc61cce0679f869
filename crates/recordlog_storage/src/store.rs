//! Log store trait definition.

use crate::chunks::LogChunks;
use crate::error::StorageResult;
use std::io::Read;

/// An append-only, durable log of opaque bytes.
///
/// # Invariants
///
/// - The content of the log always equals the concatenation of every
///   successful `append`, in call order
/// - `append` does not return until the bytes are on stable storage
/// - `read_all` starts at offset 0 on every call
/// - A log that has never been appended to (or was destroyed) reads as empty
///
/// # Implementors
///
/// - [`super::FileLog`] - For persistent storage
/// - [`super::InMemoryLog`] - For testing
pub trait LogStore: Send {
    /// Reader type backing the chunk stream returned by [`LogStore::read_all`].
    type Reader: Read + Send;

    /// Appends `data` to the end of the log and syncs it.
    ///
    /// Returns the number of bytes written, which is always `data.len()`
    /// on success. Appending an empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened, the write fails or is
    /// short, or the sync fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<usize>;

    /// Opens the log for a full sequential read from offset 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but cannot be opened.
    fn read_all(&self) -> StorageResult<LogChunks<Self::Reader>>;

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Removes the log.
    ///
    /// Succeeds if the log is already absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing artifact exists but cannot be removed.
    fn destroy(&mut self) -> StorageResult<()>;
}
