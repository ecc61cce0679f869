//! # RecordLog Storage
//!
//! The persistent log behind the RecordLog service.
//!
//! A log is an **append-only byte store**: records are written to the end,
//! forced to stable storage before the append returns, and read back in full
//! from offset 0. The store never interprets the bytes it holds.
//!
//! ## Design Principles
//!
//! - Appends are single, synced writes of exactly the caller's bytes
//! - Reads always start at offset 0 and run to the current end
//! - A log that was never written reads as empty
//! - `destroy` removes the backing artifact and is idempotent
//!
//! ## Available Stores
//!
//! - [`FileLog`] - One file on local storage
//! - [`InMemoryLog`] - For testing
//!
//! ## Example
//!
//! ```rust
//! use recordlog_storage::{InMemoryLog, LogStore};
//!
//! let mut log = InMemoryLog::new();
//! log.append(b"hello\n").unwrap();
//! log.append(b"world\n").unwrap();
//!
//! let bytes: Vec<u8> = log.read_all().unwrap().read_to_vec().unwrap();
//! assert_eq!(&bytes, b"hello\nworld\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod chunks;
mod error;
mod file;
mod memory;
mod store;

pub use chunks::{LogChunks, DEFAULT_CHUNK_SIZE};
pub use error::{StorageError, StorageResult};
pub use file::{FileLog, FileLogReader};
pub use memory::InMemoryLog;
pub use store::LogStore;
