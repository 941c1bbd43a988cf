//! The action executor (C7, spec §4.7): given a surviving ActionIntent past
//! the gate, performs delete / trash / hardlink / quarantine, with an
//! optional pre-action backup and full dry-run support.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::error::ReasonCode;
use crate::types::{ActionKind, ActionOutcome, FileRecord, RunConfig};

use super::backup::backup_before_destroy;

/// Execute the configured action against `target` (a confirmed non-survivor
/// in `survivor`'s group). In dry-run mode every branch is traversed up to
/// but not including the mutating step.
pub fn execute(cfg: &RunConfig, group_id: u32, target: &FileRecord, survivor: &FileRecord) -> ActionOutcome {
    let mut outcome = ActionOutcome {
        path: target.path.clone(),
        group_id,
        intended: cfg.action,
        effected: None,
        bytes_reclaimed: 0,
        failure_reason: None,
        backup_path: None,
        dry_run: cfg.dry_run,
    };

    if cfg.dry_run {
        outcome.effected = Some(cfg.action);
        return outcome;
    }

    if let Some(backup_dir) = &cfg.backup_dir {
        match backup_before_destroy(&target.path, backup_dir, Utc::now().timestamp()) {
            Ok(path) => outcome.backup_path = Some(path),
            Err(_) => {
                outcome.failure_reason = Some(ReasonCode::ActionBackup);
                return outcome;
            }
        }
    }

    let result = match cfg.action {
        ActionKind::Delete => delete(&target.path),
        ActionKind::Trash => trash(&target.path, cfg.trash_fallback_to_delete),
        ActionKind::Hardlink => hardlink_replace(&survivor.path, &target.path),
        ActionKind::Quarantine => quarantine(&target.path, cfg.quarantine_dir.as_deref()),
    };

    match result {
        Ok(()) => {
            outcome.effected = Some(cfg.action);
            outcome.bytes_reclaimed = target.size;
        }
        Err(_) => {
            outcome.failure_reason = Some(ReasonCode::ActionIo);
        }
    }
    outcome
}

fn delete(target: &Path) -> Result<()> {
    std::fs::remove_file(target).with_context(|| format!("delete {}", target.display()))
}

fn trash(target: &Path, fallback_to_delete: bool) -> Result<()> {
    match trash::delete(target) {
        Ok(()) => Ok(()),
        Err(err) if fallback_to_delete => {
            log::warn!(
                "trash facility unavailable for {} ({}), falling back to delete",
                target.display(),
                err
            );
            delete(target)
        }
        Err(err) => Err(err).with_context(|| format!("send {} to trash", target.display())),
    }
}

/// Create a hardlink named by `target`'s path pointing at `survivor`'s
/// inode, atomically replacing whatever was at `target`. The portable
/// primitive is temp-link-then-rename within the target's own directory, so
/// a crash between the link and rename never leaves `target` missing (spec
/// §4.7: "a crash ... must not leave the target missing").
fn hardlink_replace(survivor: &Path, target: &Path) -> Result<()> {
    let temp_path = crate::utils::temp_sibling(target);
    std::fs::hard_link(survivor, &temp_path).with_context(|| {
        format!(
            "hardlink {} -> {}",
            temp_path.display(),
            survivor.display()
        )
    })?;
    std::fs::rename(&temp_path, target).with_context(|| {
        format!(
            "rename hardlink {} into place at {}",
            temp_path.display(),
            target.display()
        )
    })
}

/// Move `target` into `quarantine_dir`, renaming to avoid collisions by
/// appending the current epoch and a short hash of the original path (spec
/// §4.7).
fn quarantine(target: &Path, quarantine_dir: Option<&Path>) -> Result<()> {
    let dir = quarantine_dir.context("quarantine action requires a configured quarantine directory")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create quarantine directory {}", dir.display()))?;
    let dest = quarantine_dest(target, dir);
    std::fs::rename(target, &dest)
        .with_context(|| format!("quarantine {} -> {}", target.display(), dest.display()))
}

fn quarantine_dest(target: &Path, quarantine_dir: &Path) -> PathBuf {
    let stem = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let epoch = Utc::now().timestamp();
    let short_hash = short_path_hash(target);
    quarantine_dir.join(format!("{stem}.{epoch}.{short_hash}"))
}

fn short_path_hash(path: &Path) -> String {
    let digest = blake3::hash(path.to_string_lossy().as_bytes());
    digest.to_hex()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Algorithm, Digest};
    use std::time::Duration;

    fn record(path: PathBuf, size: u64) -> FileRecord {
        FileRecord::new(path, size, 0, 0).with_digest(Digest::Strong {
            algorithm: Algorithm::Md5,
            bytes: vec![1],
        })
    }

    fn base_config(tmp: &std::path::Path) -> RunConfig {
        RunConfig {
            roots: vec![],
            include_globs: vec![],
            exclude_globs: vec![],
            min_size: 0,
            max_size: None,
            max_depth: None,
            include_hidden: false,
            follow_symlinks: false,
            include_empty_files: false,
            algorithm: Algorithm::Md5,
            fast_mode: false,
            hash_timeout: Duration::from_secs(30),
            fuzzy_matching: false,
            fuzzy_threshold_percent: 0.0,
            keep_strategy: crate::types::KeepStrategy::Default,
            action: ActionKind::Delete,
            trash_fallback_to_delete: false,
            quarantine_dir: None,
            backup_dir: None,
            system_roots: vec![],
            never_delete_globs: vec![],
            critical_extensions: vec![],
            skip_system: false,
            force_system: false,
            dry_run: false,
            interactive: false,
            verify_before_destructive: false,
            cache_path: None,
            cache_retention_days: 30,
            num_threads: None,
            report_csv: None,
            report_json: None,
            report_html: None,
            email_to: None,
            audit_log_path: None,
            resume_dir: tmp.to_path_buf(),
            verbose: false,
        }
    }

    #[test]
    fn delete_removes_the_file_and_reports_bytes_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let target_path = dir.path().join("dup.txt");
        std::fs::write(&target_path, b"12345").unwrap();
        let survivor_path = dir.path().join("orig.txt");
        std::fs::write(&survivor_path, b"12345").unwrap();

        let cfg = base_config(dir.path());
        let target = record(target_path.clone(), 5);
        let survivor = record(survivor_path, 5);
        let outcome = execute(&cfg, 0, &target, &survivor);

        assert!(outcome.succeeded());
        assert_eq!(outcome.bytes_reclaimed, 5);
        assert!(!target_path.exists());
    }

    #[test]
    fn dry_run_never_touches_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let target_path = dir.path().join("dup.txt");
        std::fs::write(&target_path, b"12345").unwrap();
        let survivor_path = dir.path().join("orig.txt");
        std::fs::write(&survivor_path, b"12345").unwrap();

        let mut cfg = base_config(dir.path());
        cfg.dry_run = true;
        let target = record(target_path.clone(), 5);
        let survivor = record(survivor_path, 5);
        let outcome = execute(&cfg, 0, &target, &survivor);

        assert!(outcome.dry_run);
        assert_eq!(outcome.effected, Some(ActionKind::Delete));
        assert!(target_path.exists());
    }

    #[test]
    fn hardlink_replace_points_target_at_survivor_inode() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let survivor_path = dir.path().join("orig.txt");
        let target_path = dir.path().join("dup.txt");
        std::fs::write(&survivor_path, b"12345").unwrap();
        std::fs::write(&target_path, b"12345").unwrap();

        let mut cfg = base_config(dir.path());
        cfg.action = ActionKind::Hardlink;
        let target = record(target_path.clone(), 5);
        let survivor = record(survivor_path.clone(), 5);
        let outcome = execute(&cfg, 0, &target, &survivor);

        assert!(outcome.succeeded());
        let survivor_ino = std::fs::metadata(&survivor_path).unwrap().ino();
        let target_ino = std::fs::metadata(&target_path).unwrap().ino();
        assert_eq!(survivor_ino, target_ino);
    }

    #[test]
    fn quarantine_moves_file_into_quarantine_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target_path = dir.path().join("dup.txt");
        std::fs::write(&target_path, b"12345").unwrap();
        let survivor_path = dir.path().join("orig.txt");
        std::fs::write(&survivor_path, b"12345").unwrap();

        let quarantine_dir = dir.path().join("quarantine");
        let mut cfg = base_config(dir.path());
        cfg.action = ActionKind::Quarantine;
        cfg.quarantine_dir = Some(quarantine_dir.clone());
        let target = record(target_path.clone(), 5);
        let survivor = record(survivor_path, 5);
        let outcome = execute(&cfg, 0, &target, &survivor);

        assert!(outcome.succeeded());
        assert!(!target_path.exists());
        assert!(quarantine_dir.read_dir().unwrap().next().is_some());
    }
}
