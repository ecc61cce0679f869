//! Shutdown coordination.
//!
//! The accept loop observes a [`ShutdownHandle`] instead of global flags.
//! [`spawn_signal_bridge`] turns SIGINT/SIGTERM into a trigger on that
//! handle; tests trigger it directly with [`ShutdownHandle::shutdown`].

use crate::error::ServerResult;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// What requested the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT (Ctrl+C).
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Requested programmatically.
    Manual,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Cancellation context shared by the signal bridge and the accept loop.
///
/// Clones observe the same flag. The first trigger wins; later triggers are
/// ignored.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<Option<ShutdownSignal>>>,
    receiver: watch::Receiver<Option<ShutdownSignal>>,
}

impl ShutdownHandle {
    /// Creates a handle with the flag cleared.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Sets the flag, recording `signal` as the cause.
    pub fn trigger(&self, signal: ShutdownSignal) {
        self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(signal);
            true
        });
    }

    /// Requests a manual shutdown.
    pub fn shutdown(&self) {
        self.trigger(ShutdownSignal::Manual);
    }

    /// Returns true once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    /// Returns the cause of the shutdown, if one was requested.
    pub fn signal(&self) -> Option<ShutdownSignal> {
        *self.receiver.borrow()
    }

    /// Waits until shutdown is requested.
    pub async fn wait(&self) -> ShutdownSignal {
        let mut receiver = self.receiver.clone();
        loop {
            if let Some(signal) = *receiver.borrow_and_update() {
                return signal;
            }
            // The sender lives as long as `self`, so this only fails if
            // the channel is torn down underneath us.
            if receiver.changed().await.is_err() {
                return ShutdownSignal::Manual;
            }
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs SIGINT and SIGTERM listeners that trigger `handle`.
///
/// Must be called from within a tokio runtime. The listeners are installed
/// before this returns, so a signal delivered afterwards is never lost.
///
/// # Errors
///
/// Returns [`crate::ServerError::Signal`] if a listener cannot be installed.
#[cfg(unix)]
pub fn spawn_signal_bridge(handle: ShutdownHandle) -> ServerResult<JoinHandle<()>> {
    use crate::error::ServerError;
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).map_err(ServerError::Signal)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;

    Ok(tokio::spawn(async move {
        let caught = tokio::select! {
            _ = interrupt.recv() => ShutdownSignal::Interrupt,
            _ = terminate.recv() => ShutdownSignal::Terminate,
        };
        info!("Caught signal, exiting: {}", caught);
        handle.trigger(caught);
    }))
}

/// Installs a Ctrl+C listener that triggers `handle`.
///
/// # Errors
///
/// This variant cannot fail at install time; a failure while waiting is
/// logged and treated as no signal.
#[cfg(not(unix))]
pub fn spawn_signal_bridge(handle: ShutdownHandle) -> ServerResult<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Caught signal, exiting: {}", ShutdownSignal::Interrupt);
                handle.trigger(ShutdownSignal::Interrupt);
            }
            Err(e) => tracing::error!("Ctrl+C listener failed: {}", e),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn handle_starts_clear() {
        let handle = ShutdownHandle::new();
        assert!(!handle.is_shutdown());
        assert_eq!(handle.signal(), None);
    }

    #[test]
    fn clones_share_flag() {
        let handle = ShutdownHandle::new();
        let observer = handle.clone();
        handle.shutdown();
        assert!(observer.is_shutdown());
        assert_eq!(observer.signal(), Some(ShutdownSignal::Manual));
    }

    #[test]
    fn first_trigger_wins() {
        let handle = ShutdownHandle::new();
        handle.trigger(ShutdownSignal::Terminate);
        handle.trigger(ShutdownSignal::Interrupt);
        assert_eq!(handle.signal(), Some(ShutdownSignal::Terminate));
    }

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let handle = ShutdownHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger(ShutdownSignal::Interrupt);

        let signal = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Interrupt);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_set() {
        let handle = ShutdownHandle::new();
        handle.shutdown();
        assert_eq!(handle.wait().await, ShutdownSignal::Manual);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_bridge_triggers_handle() {
        use nix::sys::signal::{raise, Signal};

        let handle = ShutdownHandle::new();
        let bridge = spawn_signal_bridge(handle.clone()).unwrap();

        raise(Signal::SIGTERM).unwrap();

        tokio::time::timeout(Duration::from_secs(5), bridge)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.signal(), Some(ShutdownSignal::Terminate));
    }

    #[test]
    fn signal_display() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
    }
}
