//! Fingerprint cache (C2): a `rusqlite` store, WAL mode, keyed by canonical
//! path with secondary indexes for the grouper's digest and size lookups.
//!
//! Grounded on the teacher's database layer (`open_db`, `WAL_PRAGMAS`,
//! `SCHEMA`): same pragma set and "apply schema idempotently on open"
//! pattern, generalized from the `paths` table to a `cache_entries` table
//! keyed by digest instead of just path.

mod lock;
mod schema;
mod store;

pub use lock::CacheLock;
pub use store::Cache;
