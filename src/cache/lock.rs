//! Advisory single-writer lock for the cache, held for the run's lifetime.
//!
//! Grounded on the teacher's `fd_limit` use of raw `libc` calls for
//! resource-limit probing; here the same "reach past `std` for one POSIX
//! primitive" idiom covers `flock(2)`.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::ReasonCode;

/// Holds an exclusive, non-blocking `flock` on a sidecar `.lock` file next to
/// the cache database. Dropped (and thus released) when the run ends.
pub struct CacheLock {
    _file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquire the lock for `db_path`. Returns `ReasonCode::CacheLocked` if
    /// another process already holds it (spec §4.2 single-writer invariant).
    pub fn acquire(db_path: &Path) -> Result<Self> {
        let lock_path = sidecar_path(db_path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("open lock file {}", lock_path.display()))?;

        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() == Some(libc::EWOULDBLOCK) {
                anyhow::bail!(
                    "{}: cache already locked by another process ({})",
                    ReasonCode::CacheLocked,
                    lock_path.display()
                );
            }
            return Err(errno).with_context(|| format!("flock {}", lock_path.display()));
        }

        Ok(CacheLock {
            _file: file,
            path: lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sidecar_path(db_path: &Path) -> PathBuf {
    let name = db_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cache".to_string());
    db_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{name}.lock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_db_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");

        let first = CacheLock::acquire(&db_path).unwrap();
        let second = CacheLock::acquire(&db_path);
        assert!(second.is_err());
        drop(first);

        // Released once the first lock is dropped.
        let third = CacheLock::acquire(&db_path);
        assert!(third.is_ok());
    }
}
