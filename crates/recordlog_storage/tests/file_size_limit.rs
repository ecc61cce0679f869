//! Appends that hit the process file size limit.
//!
//! Kept in its own test binary because `RLIMIT_FSIZE` applies to the whole
//! process.

#![cfg(unix)]

use nix::sys::resource::{getrlimit, setrlimit, Resource};
use nix::sys::signal::{signal, SigHandler, Signal};
use recordlog_storage::{FileLog, LogStore};
use std::fs;
use tempfile::tempdir;

#[allow(unsafe_code)]
fn ignore_sigxfsz() {
    // SAFETY: installs SIG_IGN, no handler code runs.
    unsafe { signal(Signal::SIGXFSZ, SigHandler::SigIgn) }.unwrap();
}

#[test]
fn append_over_size_limit_leaves_log_intact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.dat");
    let mut log = FileLog::new(&path);
    log.append(b"ok\n").unwrap();

    ignore_sigxfsz();
    let (soft, hard) = getrlimit(Resource::RLIMIT_FSIZE).unwrap();
    setrlimit(Resource::RLIMIT_FSIZE, 8, hard).unwrap();
    let result = log.append(b"0123456789\n");
    setrlimit(Resource::RLIMIT_FSIZE, soft, hard).unwrap();

    assert!(result.is_err());
    assert_eq!(fs::read(&path).unwrap(), b"ok\n");

    log.append(b"next\n").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"ok\nnext\n");
    assert_eq!(log.size().unwrap(), 8);
}
