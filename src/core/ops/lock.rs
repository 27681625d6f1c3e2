//! core::ops::lock
//!
//! Exclusive per-repository lock for arbor operations.
//!
//! # Architecture
//!
//! One lock guards both the store file and the worktree: only one arbor
//! process may mutate either at a time. The lock is an OS-level exclusive
//! file lock (via `fs2`) at `.git/arbor/lock`, released automatically when
//! the guard drops.
//!
//! Acquisition is bounded: a writer retries until the configured deadline,
//! then fails with [`LockError::Busy`] so the caller can tell the user to
//! retry rather than hanging forever.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// How long acquisition waits before giving up, unless overridden.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process held the lock for the whole timeout window.
    #[error("repository is locked by another arbor process (waited {waited:?}); retry shortly")]
    Busy { waited: Duration },

    /// Failed to create the lock file or its directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// The OS lock call failed for a reason other than contention.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on the repository, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    /// `Some` while the lock is held.
    file: Option<File>,
}

impl StoreLock {
    /// Acquire the lock, waiting up to `timeout` for another holder.
    ///
    /// The parent directory is created if missing. Contention is polled at
    /// a short interval; a zero timeout degrades to a single attempt.
    ///
    /// # Errors
    ///
    /// - [`LockError::Busy`] if the deadline passes while contended
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] for other OS-level failures
    pub fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", lock_path.display(), e))
            })?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        path: lock_path.to_path_buf(),
                        file: Some(file),
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(LockError::Busy { waited });
                    }
                    std::thread::sleep(RETRY_INTERVAL.min(timeout - waited));
                }
                Err(e) => return Err(LockError::AcquireFailed(e.to_string())),
            }
        }
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard drops.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lock_path(dir: &TempDir) -> PathBuf {
        dir.path().join("arbor").join("lock")
    }

    #[test]
    fn acquire_creates_parent_and_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);

        let lock = StoreLock::acquire(&path, Duration::ZERO).unwrap();
        assert!(lock.is_held());
        assert!(path.exists());
        assert_eq!(lock.path(), path);
    }

    #[test]
    fn contended_acquire_times_out_with_busy() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);

        let _held = StoreLock::acquire(&path, Duration::ZERO).unwrap();

        let started = Instant::now();
        let result = StoreLock::acquire(&path, Duration::from_millis(250));
        assert!(matches!(result, Err(LockError::Busy { .. })));
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);

        {
            let _lock = StoreLock::acquire(&path, Duration::ZERO).unwrap();
        }
        assert!(StoreLock::acquire(&path, Duration::ZERO).is_ok());
    }

    #[test]
    fn explicit_release_allows_reacquire() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);

        let mut lock = StoreLock::acquire(&path, Duration::ZERO).unwrap();
        lock.release();
        assert!(!lock.is_held());
        lock.release(); // second release is a no-op

        assert!(StoreLock::acquire(&path, Duration::ZERO).is_ok());
    }

    #[test]
    fn waiter_gets_lock_once_freed() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);

        let held = StoreLock::acquire(&path, Duration::ZERO).unwrap();
        let contender_path = path.clone();
        let contender = std::thread::spawn(move || {
            StoreLock::acquire(&contender_path, Duration::from_secs(5))
        });

        std::thread::sleep(Duration::from_millis(200));
        drop(held);

        let lock = contender.join().unwrap().unwrap();
        assert!(lock.is_held());
    }

    #[test]
    fn busy_error_mentions_retry() {
        let err = LockError::Busy {
            waited: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("retry"));
    }
}
