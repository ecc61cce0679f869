//! One client connection, from first byte received to close.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::framer::{read_record, RecordFramer};
use recordlog_storage::LogStore;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Where a session is in its lifecycle.
///
/// Sessions move strictly forward:
/// `Receiving -> Appending -> Replying -> Closed`. Any error jumps
/// straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reading from the client until one record is framed.
    Receiving,
    /// Appending the framed record to the log.
    Appending,
    /// Streaming the whole log back to the client.
    Replying,
    /// The connection is finished.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receiving => write!(f, "RECEIVING"),
            Self::Appending => write!(f, "APPENDING"),
            Self::Replying => write!(f, "REPLYING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// How a session that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A record was appended and the log was sent back.
    Replied {
        /// Length of the appended record, terminator included.
        record_len: usize,
        /// Number of log bytes sent to the client.
        reply_len: u64,
    },
    /// The client closed before sending a terminator. Nothing was appended.
    Abandoned {
        /// Unterminated bytes that were dropped.
        discarded: usize,
    },
}

/// Drives a single connection through one record/log-dump cycle.
///
/// A session handles exactly one record. The client has to reconnect to
/// send another.
pub struct Session<'a, S: LogStore> {
    store: &'a mut S,
    recv_chunk_size: usize,
    reply_chunk_size: usize,
    state: SessionState,
}

impl<'a, S: LogStore> Session<'a, S> {
    /// Creates a session that appends to and replies from `store`.
    pub fn new(store: &'a mut S, config: &ServerConfig) -> Self {
        Self {
            store,
            recv_chunk_size: config.recv_chunk_size,
            reply_chunk_size: config.reply_chunk_size,
            state: SessionState::Receiving,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to completion over `stream`.
    ///
    /// The stream is closed when this returns, whatever the result.
    ///
    /// # Errors
    ///
    /// Returns an error if receiving, appending, reading the log, or
    /// sending fails. The error only concerns this connection.
    pub async fn run<T>(&mut self, mut stream: T) -> ServerResult<SessionOutcome>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.drive(&mut stream).await;
        self.transition(SessionState::Closed);
        result
    }

    async fn drive<T>(&mut self, stream: &mut T) -> ServerResult<SessionOutcome>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framer = RecordFramer::new();
        let Some(record) = read_record(stream, &mut framer, self.recv_chunk_size).await? else {
            let discarded = framer.finish();
            debug!("Peer closed before terminator, dropping {} bytes", discarded);
            return Ok(SessionOutcome::Abandoned { discarded });
        };
        if framer.trailing_discarded() > 0 {
            debug!(
                "Dropping {} bytes received after terminator",
                framer.trailing_discarded()
            );
        }

        self.transition(SessionState::Appending);
        self.store.append(record.as_bytes())?;

        self.transition(SessionState::Replying);
        let mut reply_len = 0u64;
        for chunk in self.store.read_all()?.with_chunk_size(self.reply_chunk_size) {
            let chunk = chunk?;
            stream.write_all(&chunk).await?;
            reply_len += chunk.len() as u64;
        }
        stream.flush().await?;
        // The whole log has been handed over; a peer that already went away
        // does not make the session a failure.
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown after reply failed: {}", e);
        }

        Ok(SessionOutcome::Replied {
            record_len: record.len(),
            reply_len,
        })
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
    }
}
