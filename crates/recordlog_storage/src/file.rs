//! File-backed log store.

use crate::chunks::LogChunks;
use crate::error::{StorageError, StorageResult};
use crate::store::LogStore;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A log stored as a single file.
///
/// The file is created lazily by the first non-empty append, together with
/// any missing parent directories. The append handle is kept open and reused
/// for subsequent appends.
///
/// # Durability
///
/// Every `append` writes the whole record with one `write_all` and then
/// calls `File::sync_all()` before returning, so an acknowledged record
/// survives a crash of the process or the machine. A failed append truncates
/// the file back to its previous length, so the log never holds part of a
/// record.
///
/// # Example
///
/// ```no_run
/// use recordlog_storage::{FileLog, LogStore};
///
/// let mut log = FileLog::new("/var/tmp/recordlogdata");
/// log.append(b"durable\n").unwrap();
/// for chunk in log.read_all().unwrap() {
///     let chunk = chunk.unwrap();
///     // send chunk somewhere
/// #   let _ = chunk;
/// }
/// log.destroy().unwrap();
/// ```
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    handle: Option<File>,
}

impl FileLog {
    /// Creates a log backed by the file at `path`.
    ///
    /// Nothing is touched on disk until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: None,
        }
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the backing file currently exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn append_handle(&mut self) -> StorageResult<&mut File> {
        let file = match self.handle.take() {
            Some(file) => file,
            None => self.open_for_append()?,
        };
        Ok(self.handle.insert(file))
    }

    fn open_for_append(&self) -> StorageResult<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o664);
        }

        let file = options.open(&self.path)?;
        debug!(path = %self.path.display(), "opened log for append");
        Ok(file)
    }
}

impl LogStore for FileLog {
    type Reader = FileLogReader;

    fn append(&mut self, data: &[u8]) -> StorageResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let file = self.append_handle()?;
        if let Err(e) = append_record(file, data) {
            // Reopen on the next append instead of trusting this handle.
            self.handle = None;
            return Err(e);
        }
        Ok(data.len())
    }

    fn read_all(&self) -> StorageResult<LogChunks<Self::Reader>> {
        let file = match File::open(&self.path) {
            Ok(file) => Some(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(LogChunks::new(FileLogReader { file }))
    }

    fn size(&self) -> StorageResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn destroy(&mut self) -> StorageResult<()> {
        self.handle = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed log");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The file operations an append needs, so the rollback path can be
/// exercised without a real disk failure.
trait AppendTarget: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&self, len: u64) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
}

impl AppendTarget for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Writes and syncs `data` in full, or leaves the file at its old length.
fn append_record<F: AppendTarget>(file: &mut F, data: &[u8]) -> StorageResult<()> {
    let before = file.len()?;
    let result = write_synced(file, data, before);
    if result.is_err() {
        rollback(file, before);
    }
    result
}

fn write_synced<F: AppendTarget>(file: &mut F, data: &[u8], before: u64) -> StorageResult<()> {
    file.write_all(data)?;
    file.sync()?;

    let written = file.len()?.saturating_sub(before);
    if written != data.len() as u64 {
        return Err(StorageError::ShortWrite {
            expected: data.len(),
            written,
        });
    }
    Ok(())
}

fn rollback<F: AppendTarget>(file: &F, len: u64) {
    match file.truncate(len).and_then(|()| file.sync()) {
        Ok(()) => debug!(len, "rolled back partial append"),
        Err(e) => warn!(len, error = %e, "failed to roll back partial append"),
    }
}

/// Read handle over a [`FileLog`].
///
/// Reads as empty when the log file did not exist at open time.
#[derive(Debug)]
pub struct FileLogReader {
    file: Option<File>,
}

impl Read for FileLogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }
}
