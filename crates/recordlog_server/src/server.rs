//! Listener setup and the accept loop.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::session::{Session, SessionOutcome};
use crate::shutdown::{spawn_signal_bridge, ShutdownHandle};
use recordlog_storage::{FileLog, LogStore};
use std::io;
use std::net::SocketAddr;
#[cfg(not(unix))]
use std::net::ToSocketAddrs;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Lists the addresses to try binding, in preference order.
///
/// Both cases go through one passive stream-socket lookup with no address
/// family preference. Without a host the resolver returns the wildcard
/// addresses of every configured family. The resolver's order is kept.
///
/// # Errors
///
/// Returns [`ServerError::Resolve`] if the lookup fails or yields nothing.
pub fn resolve_addrs(host: Option<&str>, port: u16) -> ServerResult<Vec<SocketAddr>> {
    let addrs = lookup_passive(host, port).map_err(ServerError::Resolve)?;
    if addrs.is_empty() {
        return Err(ServerError::Resolve(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses for {}", host.unwrap_or("wildcard")),
        )));
    }
    Ok(addrs)
}

#[cfg(unix)]
fn lookup_passive(host: Option<&str>, port: u16) -> io::Result<Vec<SocketAddr>> {
    use dns_lookup::{getaddrinfo, AddrInfoHints};

    let hints = AddrInfoHints {
        socktype: libc::SOCK_STREAM,
        protocol: 0,
        address: libc::AF_UNSPEC,
        flags: libc::AI_PASSIVE,
    };
    let service = port.to_string();
    getaddrinfo(host, Some(&service), Some(hints))
        .map_err(io::Error::from)?
        .map(|info| info.map(|info| info.sockaddr))
        .collect()
}

#[cfg(not(unix))]
fn lookup_passive(host: Option<&str>, port: u16) -> io::Result<Vec<SocketAddr>> {
    use std::net::{Ipv4Addr, Ipv6Addr};

    match host {
        Some(host) => Ok((host, port).to_socket_addrs()?.collect()),
        None => Ok(vec![
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        ]),
    }
}

/// Binds the first resolvable address that accepts a listener.
///
/// Each failed candidate is logged and the next one is tried.
///
/// # Errors
///
/// Returns [`ServerError::Resolve`] or [`ServerError::Bind`]. Both are
/// setup errors.
pub fn bind_listener(config: &ServerConfig) -> ServerResult<std::net::TcpListener> {
    let addrs = resolve_addrs(config.bind_host.as_deref(), config.port)?;

    let mut last_error = None;
    for addr in &addrs {
        match std::net::TcpListener::bind(addr) {
            Ok(listener) => {
                debug!("Bound {}", addr);
                return Ok(listener);
            }
            Err(e) => {
                warn!("Binding {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    let source = last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no candidate addresses")
    });
    Err(ServerError::Bind { addrs, source })
}

/// The record log service.
///
/// Serves one connection at a time: each accepted client runs a full
/// [`Session`] before the next `accept`. Clients that connect meanwhile
/// wait in the listen backlog.
///
/// # Example
///
/// ```no_run
/// use recordlog_server::{bind_listener, LogServer, ServerConfig, ShutdownHandle};
/// use recordlog_storage::FileLog;
///
/// # async fn example() -> recordlog_server::ServerResult<()> {
/// let config = ServerConfig::new(9000).with_data_path("/tmp/records");
/// let listener = bind_listener(&config)?;
/// let store = FileLog::new(&config.data_path);
/// let server = LogServer::new(listener, store, config)?;
///
/// let shutdown = ShutdownHandle::new();
/// server.serve(shutdown).await?;
/// # Ok(())
/// # }
/// ```
pub struct LogServer<S: LogStore> {
    config: ServerConfig,
    listener: TcpListener,
    store: S,
}

impl<S: LogStore> LogServer<S> {
    /// Creates a server on an already bound listener.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be registered with the
    /// runtime.
    pub fn new(
        listener: std::net::TcpListener,
        store: S,
        config: ServerConfig,
    ) -> ServerResult<Self> {
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        Ok(Self {
            config,
            listener,
            store,
        })
    }

    /// Returns the address the server is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop until `shutdown` is triggered.
    ///
    /// A shutdown while waiting for a connection stops the loop at once. A
    /// shutdown during a session lets that session finish first. On the
    /// way out the listener is closed and the log is destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Accept`] if accepting a connection fails. The
    /// log is left in place in that case.
    pub async fn serve(mut self, shutdown: ShutdownHandle) -> ServerResult<()> {
        info!("Listening on {}", self.local_addr()?);

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let (stream, peer) = tokio::select! {
                biased;
                signal = shutdown.wait() => {
                    debug!("Shutdown ({}) while waiting for a connection", signal);
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        return Err(ServerError::Accept(e));
                    }
                },
            };

            self.handle_connection(stream, peer).await;
        }

        drop(self.listener);
        if let Err(e) = self.store.destroy() {
            error!("Failed to remove log: {}", e);
        }
        info!("Server shut down");
        Ok(())
    }

    async fn handle_connection(&mut self, stream: TcpStream, peer: SocketAddr) {
        info!("Accepted connection from {}", peer.ip());

        let mut session = Session::new(&mut self.store, &self.config);
        match session.run(stream).await {
            Ok(SessionOutcome::Replied {
                record_len,
                reply_len,
            }) => {
                debug!(
                    "Appended {} byte record, replied with {} bytes",
                    record_len, reply_len
                );
                match self.store.size() {
                    Ok(size) if size != reply_len => warn!(
                        "Log is {} bytes but the reply carried {} bytes",
                        size, reply_len
                    ),
                    Ok(size) => debug!("Log is now {} bytes", size),
                    Err(e) => warn!("Could not read log size: {}", e),
                }
            }
            Ok(SessionOutcome::Abandoned { discarded }) => {
                info!(
                    "Connection from {} closed without a complete record ({} bytes dropped)",
                    peer.ip(),
                    discarded
                );
            }
            Err(e) => error!("Session with {} failed: {}", peer.ip(), e),
        }

        info!("Closed connection from {}", peer.ip());
    }
}

/// Runs the service described by `config` until a signal stops it.
///
/// Binds the listener, detaches if configured, then serves a [`FileLog`]
/// at `config.data_path` on a single-threaded runtime with SIGINT/SIGTERM
/// wired to shutdown. In daemon mode the parent process returns `Ok(())`
/// right after the fork.
///
/// # Errors
///
/// Returns a setup error if the service cannot start, or
/// [`ServerError::Accept`] if the accept loop fails.
pub fn run(config: ServerConfig) -> ServerResult<()> {
    let listener = bind_listener(&config)?;

    if config.daemonize && detach_process()? {
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;

    runtime.block_on(async move {
        let shutdown = ShutdownHandle::new();
        spawn_signal_bridge(shutdown.clone())?;

        let store = FileLog::new(&config.data_path);
        let server = LogServer::new(listener, store, config)?;
        server.serve(shutdown).await
    })
}

/// Returns true in the parent process, which should exit.
#[cfg(unix)]
fn detach_process() -> ServerResult<bool> {
    use crate::daemon::{detach, Detached};

    match detach()? {
        Detached::Parent { child } => {
            info!("Daemon started with pid {}", child);
            Ok(true)
        }
        Detached::Child => Ok(false),
    }
}

#[cfg(not(unix))]
fn detach_process() -> ServerResult<bool> {
    Err(ServerError::Daemonize("daemon mode is only supported on unix".into()))
}
