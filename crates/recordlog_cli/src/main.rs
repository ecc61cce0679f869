//! recordlogd
//!
//! Accepts newline-terminated records over TCP, appends each one to a
//! durable log file and answers with the whole log.
//!
//! # Usage
//!
//! - `recordlogd` - serve on port 9000 in the foreground
//! - `recordlogd -d` - detach and serve in the background
//! - `recordlogd -p 9100 --data-file ./records` - custom port and log path
//!
//! SIGINT or SIGTERM shuts the service down and removes the log file.

use clap::Parser;
use recordlog_server::{ServerConfig, DEFAULT_DATA_PATH, DEFAULT_PORT};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Append-only record log over TCP.
#[derive(Parser, Debug)]
#[command(name = "recordlogd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run in the background, detached from the terminal
    #[arg(short, long)]
    daemon: bool,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host to bind instead of all interfaces
    #[arg(long)]
    bind: Option<String>,

    /// Path of the log file
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data_file: PathBuf,

    /// Write diagnostics to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> std::io::Result<ServerConfig> {
        // Daemon mode changes directory to `/`, so pin relative paths now.
        let data_path = std::path::absolute(&self.data_file)?;

        let mut config = ServerConfig::new(self.port)
            .with_data_path(data_path)
            .with_daemonize(self.daemon);
        if let Some(host) = &self.bind {
            config = config.with_bind_host(host.clone());
        }
        Ok(config)
    }
}

fn init_logging(cli: &Cli) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("recordlogd: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid data file path {:?}: {}", cli.data_file, e);
            return ExitCode::FAILURE;
        }
    };

    match recordlog_server::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
