//! Schema and pragma constants for the fingerprint cache, carried over from
//! the teacher's `db_ops` WAL tuning.

/// WAL tuning pragmas, applied after `PRAGMA journal_mode = WAL`.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    path TEXT PRIMARY KEY,
    size INTEGER NOT NULL,
    mtime_ns INTEGER NOT NULL,
    digest_tag TEXT NOT NULL,
    digest_bytes BLOB NOT NULL,
    last_scan_epoch INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_digest ON cache_entries(digest_tag, digest_bytes);
CREATE INDEX IF NOT EXISTS idx_cache_entries_size ON cache_entries(size);

CREATE TABLE IF NOT EXISTS diskinfo (
    root_path TEXT PRIMARY KEY,
    data TEXT NOT NULL
);
"#;

pub(crate) const UPSERT_SQL: &str = "INSERT OR REPLACE INTO cache_entries \
    (path, size, mtime_ns, digest_tag, digest_bytes, last_scan_epoch) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
