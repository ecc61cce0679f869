//! # RecordLog Server
//!
//! A TCP service that appends newline-terminated records to a durable log
//! and answers every record with the full log.
//!
//! # Protocol
//!
//! 1. A client connects and sends bytes
//! 2. The first `\n` ends the record; bytes after it in the same read are
//!    dropped
//! 3. The record is appended to the log and synced to disk
//! 4. The server writes the entire log back and closes the connection
//!
//! One record per connection, one connection at a time. Clients that
//! connect while another is being served wait in the listen backlog.
//!
//! # Lifecycle
//!
//! ```rust,ignore
//! use recordlog_server::{run, ServerConfig};
//!
//! let config = ServerConfig::new(9000).with_daemonize(true);
//! run(config)?;
//! ```
//!
//! SIGINT or SIGTERM stops the accept loop, lets an in-flight session
//! finish, and removes the log file.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
#[cfg(unix)]
mod daemon;
mod error;
mod framer;
mod server;
mod session;
mod shutdown;

pub use config::{ServerConfig, DEFAULT_DATA_PATH, DEFAULT_PORT, DEFAULT_RECV_CHUNK};
#[cfg(unix)]
pub use daemon::{detach, is_detached, Detached};
pub use error::{ServerError, ServerResult};
pub use framer::{read_record, Record, RecordFramer, TERMINATOR};
pub use server::{bind_listener, resolve_addrs, run, LogServer};
pub use session::{Session, SessionOutcome, SessionState};
pub use shutdown::{spawn_signal_bridge, ShutdownHandle, ShutdownSignal};
