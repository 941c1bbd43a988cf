//! Atomic "write to a temp sibling, then rename" helper.
//!
//! Carried over from the teacher's index-file temp-then-rename pattern
//! (`prepare_index_work_path` / `rename_temp_to_final`), generalized from
//! "one SQLite file" to "any file we must never leave half-written" —
//! resume-state files (spec §3 `ResumePoint`) and pre-action backups
//! (spec §4.7) both need the same crash-safety property.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Temp sibling path for `final_path`, in the same directory so the rename
/// stays on one filesystem.
pub fn temp_sibling(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tmp".to_string());
    final_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{name}.tmp"))
}

/// Write `contents` to a temp sibling of `final_path`, then atomically
/// rename it into place. A crash mid-write leaves only the `.tmp` file
/// behind; `final_path` either has the old contents or the new ones, never
/// a partial write.
pub fn write_atomic(final_path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = temp_sibling(final_path);
    fs::write(&temp_path, contents)
        .with_context(|| format!("write temp file {}", temp_path.display()))?;
    rename_temp_to_final(&temp_path, final_path)
}

pub fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "atomic rename ({} -> {})",
            temp_path.display(),
            final_path.display()
        )
    })
}

/// Remove a stale temp sibling of `final_path`, if present (e.g. left behind
/// by a prior crash before the rename completed).
pub fn remove_stale_temp(final_path: &Path) -> Result<()> {
    let temp_path = temp_sibling(final_path);
    if temp_path.exists() {
        fs::remove_file(&temp_path)
            .with_context(|| format!("remove stale temp file {}", temp_path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.txt");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert!(!temp_sibling(&path).exists());
    }
}
