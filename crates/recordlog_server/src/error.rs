//! Error types for the record log server.

use recordlog_storage::StorageError;
use std::collections::TryReserveError;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the record log server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening address could not be resolved.
    #[error("address resolution failed: {0}")]
    Resolve(std::io::Error),

    /// No resolved address could be bound.
    #[error("failed to bind any of {addrs:?}: {source}")]
    Bind {
        /// Every candidate address that was tried.
        addrs: Vec<SocketAddr>,
        /// The error from the last candidate.
        source: std::io::Error,
    },

    /// Signal handlers could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(std::io::Error),

    /// Detaching from the controlling terminal failed.
    #[error("failed to daemonize: {0}")]
    Daemonize(String),

    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),

    /// Accepting a connection failed.
    #[error("accept failed: {0}")]
    Accept(std::io::Error),

    /// Receive or send on a client connection failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Appending to or reading the log failed.
    #[error("log storage error: {0}")]
    Storage(#[from] StorageError),

    /// The session buffer could not grow.
    #[error("session buffer allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}

impl ServerError {
    /// Returns true if this error prevents the service from starting.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            ServerError::Resolve(_)
                | ServerError::Bind { .. }
                | ServerError::Signal(_)
                | ServerError::Daemonize(_)
                | ServerError::Runtime(_)
        )
    }

    /// Returns true if this error only ends the current client session.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            ServerError::Io(_) | ServerError::Storage(_) | ServerError::Allocation(_)
        )
    }
}
