//! Chunked sequential reads over a log.

use crate::error::{StorageError, StorageResult};
use std::io::{ErrorKind, Read};

/// Default number of bytes yielded per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// A finite stream of byte chunks covering a log from offset 0 to its end.
///
/// Each item is at most `chunk_size` bytes and never empty. The stream ends
/// at end-of-file. After an error the stream is exhausted.
#[derive(Debug)]
pub struct LogChunks<R> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> LogChunks<R> {
    /// Wraps a reader positioned at the start of the log.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk_size: DEFAULT_CHUNK_SIZE,
            done: false,
        }
    }

    /// Sets the maximum chunk size. A size of zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the maximum chunk size.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Drains the remaining chunks into one buffer.
    ///
    /// # Errors
    ///
    /// Returns the first read error encountered.
    pub fn read_to_vec(self) -> StorageResult<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in self {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl<R: Read> Iterator for LogChunks<R> {
    type Item = StorageResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buffer) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    buffer.truncate(n);
                    return Some(Ok(buffer));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(StorageError::Io(e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[test]
    fn chunks_split_at_chunk_size() {
        let chunks: Vec<Vec<u8>> = LogChunks::new(Cursor::new(b"abcdefg".to_vec()))
            .with_chunk_size(3)
            .collect::<StorageResult<_>>()
            .unwrap();
        assert_eq!(chunks, vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
    }

    #[test]
    fn empty_reader_yields_nothing() {
        let mut chunks = LogChunks::new(io::empty());
        assert!(chunks.next().is_none());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let chunks = LogChunks::new(io::empty()).with_chunk_size(0);
        assert_eq!(chunks.chunk_size(), 1);
    }

    #[test]
    fn read_to_vec_concatenates() {
        let data = vec![7u8; DEFAULT_CHUNK_SIZE * 2 + 5];
        let out = LogChunks::new(Cursor::new(data.clone())).read_to_vec().unwrap();
        assert_eq!(out, data);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
        }
    }

    #[test]
    fn error_ends_stream() {
        let mut chunks = LogChunks::new(FailingReader);
        assert!(matches!(chunks.next(), Some(Err(StorageError::Io(_)))));
        assert!(chunks.next().is_none());
    }
}
