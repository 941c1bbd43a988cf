//! The fingerprint cache store itself: open, lookup, insert, evict.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

use crate::digest::{Digest, DigestTag};
use crate::types::CachedDigest;

use super::lock::CacheLock;
use super::schema::{SCHEMA, UPSERT_SQL, WAL_PRAGMAS};

/// Rows older than this retention window (days) are evicted at cache open
/// unless the caller overrides it (spec §3 `CachedDigest` invariant).
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

pub struct Cache {
    conn: Connection,
    _lock: CacheLock,
}

impl Cache {
    /// Open (or create) the cache database, apply WAL + schema, acquire the
    /// single-writer lock, and evict rows past the retention window or
    /// tagged with a different digest algorithm than `expected_tag` (the
    /// Open-Question decision in DESIGN.md: an algorithm switch invalidates
    /// the whole cache rather than mixing tags).
    pub fn open(path: &Path, retention_days: u32, expected_tag: DigestTag) -> Result<Self> {
        let lock = CacheLock::acquire(path)?;

        let conn = Connection::open(path)
            .with_context(|| format!("open cache database at {}", path.display()))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .context("enable WAL on cache database")?;
        conn.execute_batch(WAL_PRAGMAS)
            .context("set cache WAL pragmas")?;
        conn.execute_batch(SCHEMA).context("create cache schema")?;

        let mut cache = Cache { conn, _lock: lock };
        cache.evict_mismatched_tag(expected_tag)?;
        cache.evict_older_than(cutoff_epoch(retention_days))?;
        Ok(cache)
    }

    /// Open an in-memory cache (used by tests and `--no-cache` short trees).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory cache")?;
        conn.execute_batch(SCHEMA).context("create cache schema")?;
        // No sidecar file exists for an in-memory cache; reuse the OS temp
        // dir so the lock type stays uniform.
        let lock_target = std::env::temp_dir().join(format!("dupctl-inmem-{:x}.db", rand_seed()));
        let lock = CacheLock::acquire(&lock_target)?;
        Ok(Cache { conn, _lock: lock })
    }

    /// Look up a cached digest for `path`, reused only when the filesystem's
    /// current `(size, mtime_ns)` equals the stored pair (spec §3 invariant).
    pub fn lookup(&self, path: &Path, size: u64, mtime_ns: i64) -> Result<Option<CachedDigest>> {
        let path_str = path.to_string_lossy();
        let row: Option<(i64, i64, String, Vec<u8>, i64)> = self
            .conn
            .query_row(
                "SELECT size, mtime_ns, digest_tag, digest_bytes, last_scan_epoch \
                 FROM cache_entries WHERE path = ?1",
                params![path_str],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()
            .context("query cache_entries by path")?;

        let Some((stored_size, stored_mtime, tag_str, bytes, last_scan_epoch)) = row else {
            return Ok(None);
        };
        if stored_size as u64 != size || stored_mtime != mtime_ns {
            return Ok(None);
        }
        let Some(tag) = DigestTag::from_str(&tag_str) else {
            return Ok(None);
        };
        let digest = digest_from_tag_and_bytes(tag, bytes);
        Ok(Some(CachedDigest {
            path: path.to_path_buf(),
            digest,
            size,
            mtime_ns,
            last_scan_epoch,
        }))
    }

    /// Insert or replace the cached digest for `path`.
    pub fn insert(&self, path: &Path, size: u64, mtime_ns: i64, digest: &Digest) -> Result<()> {
        let path_str = path.to_string_lossy();
        let (tag, bytes) = digest.key();
        self.conn
            .execute(
                UPSERT_SQL,
                params![
                    path_str,
                    size as i64,
                    mtime_ns,
                    tag.as_str(),
                    bytes,
                    Utc::now().timestamp()
                ],
            )
            .context("upsert cache_entries row")?;
        Ok(())
    }

    /// Evict rows whose `last_scan_epoch` is older than `cutoff_epoch`.
    /// Returns the number of rows removed.
    pub fn evict_older_than(&self, cutoff_epoch: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM cache_entries WHERE last_scan_epoch < ?1",
                params![cutoff_epoch],
            )
            .context("evict stale cache_entries rows")?;
        Ok(removed)
    }

    /// Evict rows tagged with a digest algorithm other than `expected_tag`.
    fn evict_mismatched_tag(&mut self, expected_tag: DigestTag) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM cache_entries WHERE digest_tag != ?1",
                params![expected_tag.as_str()],
            )
            .context("evict mismatched-algorithm cache_entries rows")?;
        Ok(removed)
    }

    /// Number of rows currently stored (used by reports/tests).
    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .context("count cache_entries")?;
        Ok(n.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Raw connection, reused by `disk_detect::probe` for its own
    /// `diskinfo` table (same connection, same WAL-mode file).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn digest_from_tag_and_bytes(tag: DigestTag, bytes: Vec<u8>) -> Digest {
    match tag {
        DigestTag::Md5 => Digest::Strong {
            algorithm: crate::digest::Algorithm::Md5,
            bytes,
        },
        DigestTag::Sha256 => Digest::Strong {
            algorithm: crate::digest::Algorithm::Sha256,
            bytes,
        },
        DigestTag::Sha512 => Digest::Strong {
            algorithm: crate::digest::Algorithm::Sha512,
            bytes,
        },
        DigestTag::Fast => {
            let mut size_bytes = [0u8; 8];
            size_bytes.copy_from_slice(&bytes[0..8]);
            let size = u64::from_be_bytes(size_bytes);
            let mut prefix = [0u8; 32];
            prefix.copy_from_slice(&bytes[8..40]);
            Digest::Fast { size, prefix }
        }
    }
}

fn cutoff_epoch(retention_days: u32) -> i64 {
    Utc::now().timestamp() - (retention_days as i64) * 86_400
}

fn rand_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ (std::process::id() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Algorithm;

    #[test]
    fn round_trips_a_strong_digest() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");
        let cache = Cache::open(&db_path, DEFAULT_RETENTION_DAYS, DigestTag::Md5).unwrap();

        let digest = Digest::Strong {
            algorithm: Algorithm::Md5,
            bytes: vec![1, 2, 3, 4],
        };
        cache
            .insert(Path::new("/tmp/a.txt"), 4, 1000, &digest)
            .unwrap();

        let hit = cache
            .lookup(Path::new("/tmp/a.txt"), 4, 1000)
            .unwrap()
            .expect("cache hit");
        assert_eq!(hit.digest.key(), digest.key());
    }

    #[test]
    fn stale_size_or_mtime_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");
        let cache = Cache::open(&db_path, DEFAULT_RETENTION_DAYS, DigestTag::Md5).unwrap();

        let digest = Digest::Strong {
            algorithm: Algorithm::Md5,
            bytes: vec![9, 9, 9],
        };
        cache
            .insert(Path::new("/tmp/b.txt"), 3, 1000, &digest)
            .unwrap();

        assert!(cache.lookup(Path::new("/tmp/b.txt"), 3, 2000).unwrap().is_none());
        assert!(cache.lookup(Path::new("/tmp/b.txt"), 4, 1000).unwrap().is_none());
    }

    #[test]
    fn opening_with_a_different_algorithm_evicts_old_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");
        {
            let cache = Cache::open(&db_path, DEFAULT_RETENTION_DAYS, DigestTag::Md5).unwrap();
            let digest = Digest::Strong {
                algorithm: Algorithm::Md5,
                bytes: vec![1],
            };
            cache.insert(Path::new("/tmp/c.txt"), 1, 1, &digest).unwrap();
        }
        let cache = Cache::open(&db_path, DEFAULT_RETENTION_DAYS, DigestTag::Sha256).unwrap();
        assert!(cache.is_empty().unwrap());
    }
}
