//! Server configuration.

use std::path::PathBuf;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 9000;

/// Default location of the log file.
pub const DEFAULT_DATA_PATH: &str = "/var/tmp/recordlogdata";

/// Default number of bytes requested per socket receive.
pub const DEFAULT_RECV_CHUNK: usize = 1024;

/// Configuration for the record log server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to resolve and bind; `None` binds the wildcard addresses.
    pub bind_host: Option<String>,
    /// Port to listen on.
    pub port: u16,
    /// Path of the log file.
    pub data_path: PathBuf,
    /// Bytes requested per socket receive.
    pub recv_chunk_size: usize,
    /// Bytes read from the log per reply chunk.
    pub reply_chunk_size: usize,
    /// Whether to detach from the controlling terminal before serving.
    pub daemonize: bool,
}

impl ServerConfig {
    /// Creates a configuration listening on `port` with default settings.
    pub fn new(port: u16) -> Self {
        Self {
            bind_host: None,
            port,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            recv_chunk_size: DEFAULT_RECV_CHUNK,
            reply_chunk_size: recordlog_storage::DEFAULT_CHUNK_SIZE,
            daemonize: false,
        }
    }

    /// Binds a specific host instead of the wildcard addresses.
    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = Some(host.into());
        self
    }

    /// Sets the log file path.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Sets the receive chunk size. Zero is treated as one.
    pub fn with_recv_chunk_size(mut self, size: usize) -> Self {
        self.recv_chunk_size = size.max(1);
        self
    }

    /// Sets the reply chunk size. Zero is treated as one.
    pub fn with_reply_chunk_size(mut self, size: usize) -> Self {
        self.reply_chunk_size = size.max(1);
        self
    }

    /// Enables or disables daemon mode.
    pub fn with_daemonize(mut self, daemonize: bool) -> Self {
        self.daemonize = daemonize;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_path, PathBuf::from("/var/tmp/recordlogdata"));
        assert_eq!(config.recv_chunk_size, 1024);
        assert!(config.bind_host.is_none());
        assert!(!config.daemonize);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new(9100)
            .with_bind_host("localhost")
            .with_data_path("/tmp/log.dat")
            .with_recv_chunk_size(0)
            .with_reply_chunk_size(16)
            .with_daemonize(true);

        assert_eq!(config.port, 9100);
        assert_eq!(config.bind_host.as_deref(), Some("localhost"));
        assert_eq!(config.data_path, PathBuf::from("/tmp/log.dat"));
        assert_eq!(config.recv_chunk_size, 1);
        assert_eq!(config.reply_chunk_size, 16);
        assert!(config.daemonize);
    }
}
