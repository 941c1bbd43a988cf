//! Metadata workers (remainder of C1): stat each candidate path into a
//! [`FileRecord`] skeleton (no digest yet), applying the size and
//! empty-file filters that need a stat call to evaluate.
//!
//! Grounded on the teacher's `spawn_metadata_workers`/`path_to_entry`.

use crossbeam_channel::{Receiver, Sender};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use super::context::WalkFilters;
use crate::types::FileRecord;

fn path_to_record(abs_path: &Path, filters: &WalkFilters) -> Option<FileRecord> {
    // The walker already admitted this path with `Path::is_file()`, which
    // follows symlinks; stat the same way here so a symlink pointing at a
    // regular file isn't dropped for looking like a symlink under `lstat`.
    let meta = std::fs::metadata(abs_path).ok()?;
    if !meta.is_file() {
        return None;
    }
    let size = meta.len();
    if size == 0 && !filters.include_empty_files {
        return None;
    }
    if size < filters.min_size {
        return None;
    }
    if let Some(max) = filters.max_size
        && size > max
    {
        return None;
    }

    let mtime_ns = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0);

    Some(FileRecord::new(
        abs_path.to_path_buf(),
        size,
        mtime_ns,
        meta.dev(),
    ))
}

fn metadata_worker_loop(path_rx: Receiver<PathBuf>, record_tx: Sender<FileRecord>, filters: WalkFilters) {
    while let Ok(abs_path) = path_rx.recv() {
        if let Some(record) = path_to_record(&abs_path, &filters) {
            if record_tx.send(record).is_err() {
                break;
            }
        }
    }
    drop(record_tx);
}

/// Spawn `num_threads` metadata workers. The caller must drop its own
/// `record_tx` handle after this so the channel closes once all workers exit.
pub fn spawn_metadata_workers(
    path_rx: Receiver<PathBuf>,
    record_tx: &Sender<FileRecord>,
    filters: &WalkFilters,
    num_threads: usize,
) -> Vec<JoinHandle<()>> {
    (0..num_threads.max(1))
        .map(|_| {
            let path_rx = path_rx.clone();
            let record_tx = record_tx.clone();
            let filters = filters.clone();
            thread::spawn(move || metadata_worker_loop(path_rx, record_tx, filters))
        })
        .collect()
}
