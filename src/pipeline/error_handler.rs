//! Post-walk error reporting: logs a summary of paths the walker skipped due
//! to permission or I/O errors (spec §4.1 failure semantics — always lenient).

use anyhow::Result;
use log::warn;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Log a warning when the walker skipped any paths. The walker's failure
/// semantics are always lenient (log + skip, spec §4.1) — there is no
/// fail-fast mode to check for here.
pub fn check_for_initial_error_or_skipped_paths(
    skipped_paths: &Arc<Mutex<Vec<PathBuf>>>,
) -> Result<()> {
    let skipped = skipped_paths.lock().unwrap();
    if !skipped.is_empty() {
        warn!(
            "walker skipped {} path(s) due to permission or I/O errors",
            skipped.len()
        );
    }
    Ok(())
}
