//! The safety gate (C6, spec §4.6): a pre-flight check applied to every
//! would-be-destroyed target before the executor touches it.
//!
//! System-root / never-delete / critical-extension sets are compiled-in
//! defaults (common Linux paths) merged with whatever the operator adds via
//! [`crate::types::RunConfig`]. The open-files / mapped-library probes are
//! Linux-only, `/proc` scans behind `cfg(target_os = "linux")`, the same
//! platform split the teacher's `disk_detect` module uses; other platforms
//! get a conservative `Ok(false)` (never refuses on a probe it cannot run).

use std::io::{IsTerminal, Write};
use std::path::Path;

use crate::error::ReasonCode;
use crate::hashing::files_byte_equal;
use crate::types::{FileRecord, RunConfig};

/// Compiled-in system roots an operator's `--system-root` flags are added
/// to, never replace (spec §4.6).
pub const DEFAULT_SYSTEM_ROOTS: &[&str] = &[
    "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/lib", "/lib64", "/boot", "/etc",
];

/// Compiled-in never-delete basename globs: kernel/init images, the dynamic
/// linker, the C runtime, init system, core shell binaries.
pub const DEFAULT_NEVER_DELETE_GLOBS: &[&str] = &[
    "vmlinuz*",
    "initrd*",
    "initramfs*",
    "ld-linux*",
    "ld-*.so*",
    "libc.so*",
    "libc-*.so",
    "systemd",
    "init",
    "sh",
    "bash",
    "dash",
];

/// Compiled-in critical extensions: shared-library and kernel-module
/// suffixes.
pub const DEFAULT_CRITICAL_EXTENSIONS: &[&str] = &["so", "ko"];

/// Why the gate refused a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Allowed,
    Refused(ReasonCode),
}

impl GateVerdict {
    pub fn is_allowed(self) -> bool {
        matches!(self, GateVerdict::Allowed)
    }
}

/// Run every gate check against `target`, skipping the hardlink-specific and
/// fast-mode checks when they don't apply. `survivor` is the group's kept
/// member, needed for the cross-device and byte-verification checks.
///
/// Only the system-root check (spec §4.6 bullet 1) can be overridden by
/// `--force-system`, and only with an explicit confirmation token typed at
/// an interactive controlling terminal; non-interactively the override is
/// never granted. The never-delete-glob and critical-extension checks
/// (bullets 2-3) have no override and stay absolute regardless of
/// `force_system`.
pub fn check(cfg: &RunConfig, target: &FileRecord, survivor: &FileRecord) -> GateVerdict {
    if is_system_root(cfg, &target.path)
        && !(cfg.force_system && confirm_system_root_override(&target.path))
    {
        return GateVerdict::Refused(ReasonCode::GateSystem);
    }
    if matches_never_delete(cfg, &target.path) {
        return GateVerdict::Refused(ReasonCode::GateSystem);
    }
    if has_critical_extension(cfg, &target.path) {
        return GateVerdict::Refused(ReasonCode::GateSystem);
    }
    if is_open_by_some_process(&target.path) {
        return GateVerdict::Refused(ReasonCode::GateInUse);
    }
    if looks_like_shared_library(&target.path) && is_mapped_by_some_process(&target.path) {
        return GateVerdict::Refused(ReasonCode::GateLoaded);
    }
    if owned_by_other_privileged_principal(&target.path) {
        return GateVerdict::Refused(ReasonCode::GateOwner);
    }
    if cfg.action == crate::types::ActionKind::Hardlink && target.device_id != survivor.device_id
    {
        return GateVerdict::Refused(ReasonCode::GateCrossDevice);
    }
    if cfg.requires_verification() {
        match files_byte_equal(&survivor.path, &target.path) {
            Ok(true) => {}
            Ok(false) | Err(_) => return GateVerdict::Refused(ReasonCode::GateNotIdentical),
        }
    }
    GateVerdict::Allowed
}

/// True when `path` lies under a compiled-in or operator-added system root.
/// Exposed for the report writer's `is-system` flag (spec §6 CSV/JSON
/// schemas) as well as the gate's own first check.
pub fn is_system_root(cfg: &RunConfig, path: &Path) -> bool {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    DEFAULT_SYSTEM_ROOTS
        .iter()
        .map(Path::new)
        .chain(cfg.system_roots.iter().map(Path::as_path))
        .any(|root| canonical.starts_with(root))
}

/// Literal token the operator must type to confirm a `--force-system`
/// system-root override (spec §4.6).
const SYSTEM_OVERRIDE_TOKEN: &str = "YES";

/// Only grants the override at an interactive controlling terminal, and
/// only after the operator types the literal confirmation token; a
/// non-interactive session (piped stdin, no tty) always refuses.
fn confirm_system_root_override(path: &Path) -> bool {
    if !std::io::stdin().is_terminal() {
        return false;
    }
    print!(
        "system-root override requested for {}; type {SYSTEM_OVERRIDE_TOKEN} to confirm: ",
        path.display()
    );
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
        return false;
    }
    line.trim() == SYSTEM_OVERRIDE_TOKEN
}

fn matches_never_delete(cfg: &RunConfig, path: &Path) -> bool {
    let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    DEFAULT_NEVER_DELETE_GLOBS
        .iter()
        .map(|s| s.to_string())
        .chain(cfg.never_delete_globs.iter().cloned())
        .any(|pattern| crate::pathutil::glob_match(&pattern, basename))
}

fn has_critical_extension(cfg: &RunConfig, path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    DEFAULT_CRITICAL_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .chain(cfg.critical_extensions.iter().cloned())
        .any(|critical| critical.eq_ignore_ascii_case(ext))
}

fn looks_like_shared_library(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("so"))
        || path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(".so."))
}

#[cfg(target_os = "linux")]
fn is_open_by_some_process(path: &Path) -> bool {
    procfs::open_files_probe(path)
}

#[cfg(not(target_os = "linux"))]
fn is_open_by_some_process(_path: &Path) -> bool {
    false
}

#[cfg(target_os = "linux")]
fn is_mapped_by_some_process(path: &Path) -> bool {
    procfs::mapped_libraries_probe(path)
}

#[cfg(not(target_os = "linux"))]
fn is_mapped_by_some_process(_path: &Path) -> bool {
    false
}

fn owned_by_other_privileged_principal(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        let file_uid = meta.uid();
        let current_uid = unsafe { libc::geteuid() };
        file_uid != current_uid && (file_uid == 0 || current_uid == 0)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Linux-only `/proc` scans for the open-files and mapped-library checks.
/// Best-effort and time-bounded; any I/O failure is treated as "not found"
/// rather than refusing the gate on a probe error.
#[cfg(target_os = "linux")]
mod procfs {
    use std::path::Path;
    use std::time::Duration;

    const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn open_files_probe(target: &Path) -> bool {
        run_bounded(|| scan_proc(target, ProbeKind::OpenFds))
    }

    pub fn mapped_libraries_probe(target: &Path) -> bool {
        run_bounded(|| scan_proc(target, ProbeKind::Maps))
    }

    enum ProbeKind {
        OpenFds,
        Maps,
    }

    fn run_bounded(f: impl FnOnce() -> bool + Send + 'static) -> bool {
        let (tx, rx) = crossbeam_channel::bounded(1);
        std::thread::spawn(move || {
            let _ = tx.send(f());
        });
        crossbeam_channel::select! {
            recv(rx) -> found => found.unwrap_or(false),
            recv(crossbeam_channel::after(PROBE_TIMEOUT)) -> _ => false,
        }
    }

    fn scan_proc(target: &Path, kind: ProbeKind) -> bool {
        let canonical = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return false;
        };
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            let hit = match kind {
                ProbeKind::OpenFds => scan_fds(pid, &canonical),
                ProbeKind::Maps => scan_maps(pid, &canonical),
            };
            if hit {
                return true;
            }
        }
        false
    }

    fn scan_fds(pid: u32, target: &Path) -> bool {
        let Ok(entries) = std::fs::read_dir(format!("/proc/{pid}/fd")) else {
            return false;
        };
        entries.flatten().any(|e| {
            std::fs::read_link(e.path())
                .map(|link| link == target)
                .unwrap_or(false)
        })
    }

    fn scan_maps(pid: u32, target: &Path) -> bool {
        let Ok(contents) = std::fs::read_to_string(format!("/proc/{pid}/maps")) else {
            return false;
        };
        let target_str = target.to_string_lossy();
        contents.lines().any(|line| line.ends_with(target_str.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Algorithm, Digest};
    use crate::types::RunConfig;
    use std::path::PathBuf;
    use std::time::Duration;

    fn base_config() -> RunConfig {
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
            action: crate::types::ActionKind::Delete,
            trash_fallback_to_delete: false,
            quarantine_dir: None,
            backup_dir: None,
            system_roots: vec![],
            never_delete_globs: vec![],
            critical_extensions: vec![],
            skip_system: false,
            force_system: false,
            dry_run: true,
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
            resume_dir: std::env::temp_dir(),
            verbose: false,
        }
    }

    fn record(path: &str, device_id: u64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), 10, 0, device_id).with_digest(Digest::Strong {
            algorithm: Algorithm::Md5,
            bytes: vec![1],
        })
    }

    #[test]
    fn refuses_known_system_root() {
        let cfg = base_config();
        let target = record("/bin/ls", 1);
        let survivor = record("/home/user/ls-copy", 1);
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateSystem)
        );
    }

    #[test]
    fn refuses_never_delete_basename() {
        let mut cfg = base_config();
        cfg.never_delete_globs.push("important.*".to_string());
        let target = record("/home/user/important.db", 1);
        let survivor = record("/home/user/important.db.bak", 1);
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateSystem)
        );
    }

    #[test]
    fn refuses_critical_extension() {
        let cfg = base_config();
        let target = record("/home/user/plugin.ko", 1);
        let survivor = record("/home/user/plugin.ko.bak", 1);
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateSystem)
        );
    }

    #[test]
    fn refuses_cross_device_hardlink() {
        let mut cfg = base_config();
        cfg.action = crate::types::ActionKind::Hardlink;
        let target = record("/mnt/a/file", 2);
        let survivor = record("/mnt/b/file", 1);
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateCrossDevice)
        );
    }

    #[test]
    fn allows_ordinary_target() {
        let cfg = base_config();
        let target = record("/home/user/dup.txt", 1);
        let survivor = record("/home/user/orig.txt", 1);
        // Neither file exists on disk, so open-files/mapped-library probes
        // trivially report false and the gate allows it through.
        assert_eq!(check(&cfg, &target, &survivor), GateVerdict::Allowed);
    }

    #[test]
    fn force_system_without_interactive_terminal_still_refuses_system_root() {
        let mut cfg = base_config();
        cfg.force_system = true;
        let target = record("/bin/ls", 1);
        let survivor = record("/home/user/ls-copy", 1);
        // The test harness's stdin is never an interactive controlling
        // terminal, so the confirmation step can never succeed here.
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateSystem)
        );
    }

    #[test]
    fn force_system_never_overrides_never_delete_or_critical_extension() {
        let mut cfg = base_config();
        cfg.force_system = true;
        cfg.never_delete_globs.push("important.*".to_string());

        let target = record("/home/user/important.db", 1);
        let survivor = record("/home/user/important.db.bak", 1);
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateSystem)
        );

        let target = record("/home/user/plugin.ko", 1);
        let survivor = record("/home/user/plugin.ko.bak", 1);
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateSystem)
        );
    }

    #[test]
    fn fuzzy_mode_forces_verification_and_refuses_non_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let survivor_path = dir.path().join("survivor.bin");
        let target_path = dir.path().join("target.bin");
        std::fs::write(&survivor_path, b"one content").unwrap();
        std::fs::write(&target_path, b"different content").unwrap();

        let mut cfg = base_config();
        cfg.fuzzy_matching = true;
        assert!(cfg.requires_verification());

        let target = record(target_path.to_str().unwrap(), 1);
        let survivor = record(survivor_path.to_str().unwrap(), 1);
        assert_eq!(
            check(&cfg, &target, &survivor),
            GateVerdict::Refused(ReasonCode::GateNotIdentical)
        );
    }
}
