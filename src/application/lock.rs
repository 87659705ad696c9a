//! Advisory per-instance locks.
//!
//! `start` and `stop` hold an exclusive lock on `locks/{id}.lock` for their
//! whole duration. This closes same-host races between invocations on the
//! same id; it cannot make the port or existence checks atomic.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;

use fd_lock::{RwLock, RwLockWriteGuard};
use tracing::debug;

use crate::domain::InstanceId;
use crate::error::{Error, Result};

/// Directory of per-instance lock files.
#[derive(Debug, Clone)]
pub struct InstanceLocks {
    dir: PathBuf,
}

impl InstanceLocks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open (creating if needed) the lock file for `id`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory or file cannot be created.
    pub fn open(&self, id: &InstanceId) -> Result<LockFile> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.lock", id.as_str()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        Ok(LockFile {
            id: id.clone(),
            path,
            lock: RwLock::new(file),
        })
    }
}

/// An opened, not yet acquired, lock file.
pub struct LockFile {
    id: InstanceId,
    path: PathBuf,
    lock: RwLock<File>,
}

impl LockFile {
    /// Take the exclusive lock without waiting.
    ///
    /// The lock is released when the returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if another holder has the lock.
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        match self.lock.try_write() {
            Ok(guard) => {
                debug!(id = %self.id, path = %self.path.display(), "Acquired instance lock");
                Ok(guard)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(Error::Busy {
                id: self.id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
