//! Pre-action backup (spec §4.7): if a backup directory is configured, a
//! copy of the target is placed under a timestamped subtree mirroring the
//! source path before any destructive step. Backup failure aborts that
//! target's action with the reason recorded.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Copy `target` into `backup_dir/<run_epoch>/<target stripped of its root
/// prefix>`, creating parent directories as needed. Preserves mode via
/// `std::fs::copy` (which copies permission bits on Unix) and mtime via an
/// explicit `set_times` call.
pub fn backup_before_destroy(target: &Path, backup_dir: &Path, run_epoch: i64) -> Result<PathBuf> {
    let mirrored = mirror_path(target);
    let dest = backup_dir.join(run_epoch.to_string()).join(&mirrored);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create backup directory {}", parent.display()))?;
    }
    std::fs::copy(target, &dest)
        .with_context(|| format!("copy {} to backup {}", target.display(), dest.display()))?;
    preserve_mtime(target, &dest);
    Ok(dest)
}

/// Strip the leading root separator so the mirrored path joins cleanly under
/// the backup directory (`/a/b/c` -> `a/b/c`).
fn mirror_path(target: &Path) -> PathBuf {
    target.components().skip(1).collect()
}

fn preserve_mtime(source: &Path, dest: &Path) {
    if let Ok(meta) = std::fs::metadata(source) {
        if let Ok(mtime) = meta.modified() {
            let _ = filetime_set(dest, mtime);
        }
    }
}

fn filetime_set(path: &Path, mtime: std::time::SystemTime) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    let mtime_ft = mtime
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let times = [
        libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_OMIT,
        },
        libc::timespec {
            tv_sec: mtime_ft.as_secs() as libc::time_t,
            tv_nsec: mtime_ft.subsec_nanos() as i64,
        },
    ];
    use std::os::unix::io::AsRawFd;
    let ret = unsafe { libc::futimens(file.as_raw_fd(), times.as_ptr()) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
