//! Detaching from the controlling terminal.

use crate::error::{ServerError, ServerResult};
use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, dup2, fork, setsid, ForkResult};
use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static DETACHED: AtomicBool = AtomicBool::new(false);

/// Which side of the fork the caller is on after [`detach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detached {
    /// The process that called `detach`. It should exit successfully without serving.
    Parent {
        /// Process id of the daemon.
        child: i32,
    },
    /// The daemon. It continues into the serve loop.
    Child,
}

/// Returns true if this process has already detached.
pub fn is_detached() -> bool {
    DETACHED.load(Ordering::SeqCst)
}

/// Runs the process in the background.
///
/// Forks; the child starts a new session, clears the umask, changes its
/// working directory to `/`, and points stdin, stdout and stderr at
/// `/dev/null`. Calling this again in an already detached process does
/// nothing and returns [`Detached::Child`].
///
/// Must be called before the async runtime or any other thread starts.
///
/// # Errors
///
/// Returns [`ServerError::Daemonize`] if any step fails.
pub fn detach() -> ServerResult<Detached> {
    if is_detached() {
        return Ok(Detached::Child);
    }

    if let ForkResult::Parent { child } = fork_process()? {
        debug!("Forked daemon with pid {}", child);
        return Ok(Detached::Parent {
            child: child.as_raw(),
        });
    }

    umask(Mode::empty());
    setsid().map_err(|e| daemon_error("setsid", e))?;
    chdir("/").map_err(|e| daemon_error("chdir", e))?;
    redirect_std_streams()?;

    DETACHED.store(true, Ordering::SeqCst);
    Ok(Detached::Child)
}

#[allow(unsafe_code)]
fn fork_process() -> ServerResult<ForkResult> {
    // SAFETY: only called from `detach`, which runs before any runtime or
    // worker thread exists, so the child is a copy of a single-threaded
    // process and may continue running arbitrary code.
    unsafe { fork() }.map_err(|e| daemon_error("fork", e))
}

fn redirect_std_streams() -> ServerResult<()> {
    let null = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| ServerError::Daemonize(format!("open /dev/null: {e}")))?;

    for target in 0..=2 {
        dup2(null.as_raw_fd(), target).map_err(|e| daemon_error("dup2", e))?;
    }
    Ok(())
}

fn daemon_error(step: &str, errno: nix::errno::Errno) -> ServerError {
    ServerError::Daemonize(format!("{step}: {errno}"))
}
