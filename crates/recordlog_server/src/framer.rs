//! Newline framing of a client byte stream.
//!
//! A [`RecordFramer`] owns the per-connection session buffer. Chunks are
//! appended as they arrive; the first terminator completes a record and
//! resets the buffer. Bytes that follow the terminator in the same chunk
//! are dropped rather than carried into the next record.

use crate::error::ServerResult;
use std::collections::TryReserveError;
use std::mem;
use tokio::io::{AsyncRead, AsyncReadExt};

/// The byte that ends a record.
pub const TERMINATOR: u8 = b'\n';

/// One terminator-delimited unit of client data, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record(Vec<u8>);

impl Record {
    /// Returns the record bytes, ending with [`TERMINATOR`].
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the record length including the terminator.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a record holds at least its terminator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the record, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Accumulates received bytes until a terminator completes a record.
///
/// There is no upper bound on record size; growth is limited only by
/// available memory, and a failed reservation is reported instead of
/// aborting the process.
///
/// # Example
///
/// ```
/// use recordlog_server::RecordFramer;
///
/// let mut framer = RecordFramer::new();
/// assert!(framer.push(b"hel").unwrap().is_none());
/// let record = framer.push(b"lo\n").unwrap().unwrap();
/// assert_eq!(record.as_bytes(), b"hello\n");
/// assert!(framer.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordFramer {
    buffer: Vec<u8>,
    trailing_discarded: usize,
}

impl RecordFramer {
    /// Creates a framer with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one received chunk.
    ///
    /// Returns the completed record if `chunk` contains a terminator. The
    /// buffer is empty afterwards, and any bytes after the terminator in
    /// `chunk` are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot grow by `chunk.len()` bytes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Record>, TryReserveError> {
        self.buffer.try_reserve(chunk.len())?;

        // Earlier bytes were already scanned and held no terminator.
        let scan_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let Some(pos) = self.buffer[scan_from..]
            .iter()
            .position(|&b| b == TERMINATOR)
        else {
            return Ok(None);
        };

        let end = scan_from + pos + 1;
        self.trailing_discarded += self.buffer.len() - end;
        self.buffer.truncate(end);
        Ok(Some(Record(mem::take(&mut self.buffer))))
    }

    /// Returns the number of buffered bytes not yet part of a record.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no partial record is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the total number of bytes dropped after terminators.
    #[must_use]
    pub fn trailing_discarded(&self) -> usize {
        self.trailing_discarded
    }

    /// Ends framing, returning the number of unterminated bytes dropped.
    pub fn finish(self) -> usize {
        self.buffer.len()
    }
}

/// Reads from `reader` until `framer` completes a record.
///
/// Returns `Ok(None)` if the peer closes the stream before a terminator
/// arrives; the partial bytes stay in the framer.
///
/// # Errors
///
/// Returns an error if a receive fails or the buffer cannot grow.
pub async fn read_record<R>(
    reader: &mut R,
    framer: &mut RecordFramer,
    chunk_size: usize,
) -> ServerResult<Option<Record>>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        if let Some(record) = framer.push(&chunk[..n])? {
            return Ok(Some(record));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn single_chunk_record() {
        let mut framer = RecordFramer::new();
        let record = framer.push(b"x\n").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"x\n");
        assert_eq!(record.len(), 2);
        assert!(framer.is_empty());
    }

    #[test]
    fn record_split_across_chunks() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(b"hel").unwrap().is_none());
        assert_eq!(framer.buffered(), 3);

        let record = framer.push(b"lo\n").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"hello\n");
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn trailing_bytes_after_terminator_are_dropped() {
        let mut framer = RecordFramer::new();
        let record = framer.push(b"a\nb").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"a\n");
        assert!(framer.is_empty());
        assert_eq!(framer.trailing_discarded(), 1);
    }

    #[test]
    fn only_first_terminator_counts() {
        let mut framer = RecordFramer::new();
        let record = framer.push(b"one\ntwo\n").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"one\n");
        assert_eq!(framer.trailing_discarded(), 4);
    }

    #[test]
    fn bare_terminator_is_a_record() {
        let mut framer = RecordFramer::new();
        let record = framer.push(b"\n").unwrap().unwrap();
        assert_eq!(record.into_bytes(), b"\n");
    }

    #[test]
    fn empty_chunk_is_ignored() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(b"").unwrap().is_none());
        assert!(framer.is_empty());
    }

    #[test]
    fn nul_bytes_are_ordinary_data() {
        let mut framer = RecordFramer::new();
        assert!(framer.push(b"a\0b").unwrap().is_none());
        let record = framer.push(b"\n").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"a\0b\n");
    }

    #[test]
    fn large_record_grows_buffer() {
        let mut framer = RecordFramer::new();
        let block = vec![b'z'; 4096];
        for _ in 0..64 {
            assert!(framer.push(&block).unwrap().is_none());
        }
        let record = framer.push(b"\n").unwrap().unwrap();
        assert_eq!(record.len(), 64 * 4096 + 1);
    }

    #[test]
    fn finish_reports_partial_bytes() {
        let mut framer = RecordFramer::new();
        framer.push(b"no newline").unwrap();
        assert_eq!(framer.finish(), 10);
    }

    #[tokio::test]
    async fn read_record_from_stream() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"hel").await.unwrap();
        client.write_all(b"lo\nrest").await.unwrap();

        let mut framer = RecordFramer::new();
        let record = read_record(&mut server, &mut framer, 4).await.unwrap();
        assert_eq!(record.unwrap().as_bytes(), b"hello\n");
    }

    #[tokio::test]
    async fn read_record_peer_closed_first() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"partial").await.unwrap();
        drop(client);

        let mut framer = RecordFramer::new();
        let record = read_record(&mut server, &mut framer, 1024).await.unwrap();
        assert!(record.is_none());
        assert_eq!(framer.finish(), 7);
    }

    proptest! {
        #[test]
        fn any_chunking_frames_the_same_record(
            payload in prop::collection::vec(any::<u8>().prop_filter("no terminator", |b| *b != TERMINATOR), 0..256),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let mut message = payload.clone();
            message.push(TERMINATOR);

            let mut points: Vec<usize> = cuts.iter().map(|c| c.index(message.len())).collect();
            points.push(0);
            points.push(message.len());
            points.sort_unstable();
            points.dedup();

            let mut framer = RecordFramer::new();
            let mut records = Vec::new();
            for window in points.windows(2) {
                if let Some(record) = framer.push(&message[window[0]..window[1]]).unwrap() {
                    records.push(record);
                }
            }

            prop_assert_eq!(records.len(), 1);
            prop_assert_eq!(records[0].as_bytes(), &message[..]);
            prop_assert!(framer.is_empty());
        }
    }
}
