//! Error types for log storage.

use std::io;
use thiserror::Error;

/// Result type for log storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while appending to or reading the log.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The log did not grow by the number of bytes handed to `append`.
    #[error("short write to log: expected {expected} bytes, wrote {written}")]
    ShortWrite {
        /// Length of the record being appended.
        expected: usize,
        /// Number of bytes the log actually grew by.
        written: u64,
    },
}
