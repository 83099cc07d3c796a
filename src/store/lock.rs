//! Advisory exclusive lock over the primary repository.
//!
//! The orchestrator holds this lock whenever it may touch the store, and
//! releases it only for the window in which the external bridge is allowed
//! to rewrite the on-disk repository.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Name of the lock file inside the repository root.
pub const LOCK_FILE: &str = ".lexsync.lock";

/// An exclusive advisory lock on a repository directory.
///
/// Released explicitly via [`RepoLock::release`] or implicitly on drop.
#[derive(Debug)]
pub struct RepoLock {
    file: File,
    path: PathBuf,
}

impl RepoLock {
    /// Acquire the lock for the repository rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockFailed`] when another process holds the lock or
    /// the lock file cannot be created.
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive().map_err(|e| Error::LockFailed {
            message: format!("{}: {e}", path.display()),
        })?;
        tracing::debug!(lock = %path.display(), "acquired repository lock");
        Ok(Self { file, path })
    }

    /// Release the lock explicitly.
    pub fn release(self) {
        // Unlock before drop so a failure is at least logged.
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), "unlock failed: {e}");
        }
        tracing::debug!(lock = %self.path.display(), "released repository lock");
    }
}
