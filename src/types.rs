//! Core data model shared across the pipeline: [`FileRecord`], [`DigestGroup`],
//! [`KeepDecision`], [`ActionOutcome`], [`RunConfig`], [`ResumePoint`].

use std::path::{Path, PathBuf};

use crate::digest::Digest;
use crate::error::ReasonCode;

/// One candidate path, created by the walker and filled in by the
/// fingerprinter. Immutable once its digest is set (spec §3).
#[derive(Clone, Debug)]
pub struct FileRecord {
    /// Absolute, canonicalized path; validated as a regular file at discovery.
    pub path: PathBuf,
    pub size: u64,
    /// Modification time in nanoseconds since epoch (teacher's convention).
    pub mtime_ns: i64,
    /// `None` until the fingerprinter fills it in.
    pub digest: Option<Digest>,
    /// Device id of the filesystem the file resides on, used for hardlink
    /// eligibility.
    pub device_id: u64,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, mtime_ns: i64, device_id: u64) -> Self {
        FileRecord {
            path,
            size,
            mtime_ns,
            digest: None,
            device_id,
        }
    }

    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }
}

/// A set of [`FileRecord`] sharing identical size and digest. Cardinality is
/// always ≥ 2; groups of one are discarded by the grouper.
#[derive(Clone, Debug)]
pub struct DigestGroup {
    /// Dense, monotonically assigned id (assignment order is the order each
    /// digest was first encountered during the grouper's stable sort).
    pub id: u32,
    pub records: Vec<FileRecord>,
}

impl DigestGroup {
    /// Bytes that would be reclaimed if every non-survivor member were removed.
    pub fn wasted_space(&self) -> u64 {
        let cardinality = self.records.len() as u64;
        self.records
            .first()
            .map(|r| r.size * cardinality.saturating_sub(1))
            .unwrap_or(0)
    }
}

/// Mirrors a row of the fingerprint cache's `cache_entries` table.
#[derive(Clone, Debug)]
pub struct CachedDigest {
    pub path: PathBuf,
    pub digest: Digest,
    pub size: u64,
    pub mtime_ns: i64,
    pub last_scan_epoch: i64,
}

/// The keeper's survivor choice for one group. Derived; never persisted.
#[derive(Clone, Debug)]
pub struct KeepDecision {
    pub group_id: u32,
    /// Index into the group's `records` of the chosen survivor.
    pub survivor_index: usize,
    /// Stable tag for the rule that produced the decision (e.g.
    /// `"keep-path"`, `"newest"`, `"oldest"`, `"smart"`, `"default"`).
    pub strategy: &'static str,
}

/// The resolution action requested (and, once applied, the one actually
/// effected) for a single non-survivor target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Delete,
    Trash,
    Hardlink,
    Quarantine,
}

/// Per-target record appended to the audit log (spec §3, §4.7).
#[derive(Clone, Debug)]
pub struct ActionOutcome {
    pub path: PathBuf,
    pub group_id: u32,
    pub intended: ActionKind,
    /// `None` when the gate rejected the target or a dry run recorded a
    /// `would-X` intention instead of mutating anything.
    pub effected: Option<ActionKind>,
    pub bytes_reclaimed: u64,
    pub failure_reason: Option<ReasonCode>,
    pub backup_path: Option<PathBuf>,
    pub dry_run: bool,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        self.effected.is_some() && self.failure_reason.is_none()
    }
}

/// Policy for choosing a group's survivor (spec §4.5's five-rule cascade, in
/// cascade order).
#[derive(Clone, Debug, Default)]
pub enum KeepStrategy {
    /// Rule 1: exactly one member's path starts with this prefix.
    KeepPath(PathBuf),
    /// Rule 2: greatest mtime wins.
    Newest,
    /// Rule 3: least mtime wins.
    Oldest,
    /// Rule 4: lowest location-priority score wins (longest matching prefix
    /// in the table; unmatched paths get the worst score).
    Smart(Vec<(PathBuf, u32)>),
    /// Rule 5: lexicographically smallest path wins.
    #[default]
    Default,
}

/// The effective configuration after merging defaults, config file, and CLI
/// (in that order). Frozen once the scan begins (spec §3).
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub roots: Vec<PathBuf>,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub max_depth: Option<usize>,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
    pub include_empty_files: bool,

    pub algorithm: crate::digest::Algorithm,
    pub fast_mode: bool,
    pub hash_timeout: std::time::Duration,

    /// Run an opt-in `SizeProximity` second pass over exact-match
    /// singletons (spec §9).
    pub fuzzy_matching: bool,
    pub fuzzy_threshold_percent: f64,

    pub keep_strategy: KeepStrategy,

    pub action: ActionKind,
    pub trash_fallback_to_delete: bool,
    pub quarantine_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,

    pub system_roots: Vec<PathBuf>,
    pub never_delete_globs: Vec<String>,
    pub critical_extensions: Vec<String>,
    /// Silently drop system-protected targets from the outcome list
    /// instead of recording a refusal for each one (spec §6 `--skip-system`).
    pub skip_system: bool,
    /// Allow the system-root refusal (only) to be overridden, subject to an
    /// interactive confirmation token (spec §4.6, §6 `--force-system`); the
    /// never-delete-glob and critical-extension refusals have no override
    /// and stay absolute. Non-interactively the override is never granted.
    pub force_system: bool,

    pub dry_run: bool,
    pub interactive: bool,
    pub verify_before_destructive: bool,

    pub cache_path: Option<PathBuf>,
    pub cache_retention_days: u32,

    pub num_threads: Option<usize>,

    pub report_csv: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
    pub report_html: Option<PathBuf>,
    pub email_to: Option<String>,

    pub audit_log_path: Option<PathBuf>,
    pub resume_dir: PathBuf,

    pub verbose: bool,
}

impl RunConfig {
    /// True when the gate must treat a digest match as unverified and should
    /// upgrade to a byte comparison before any destructive action (spec §3
    /// invariant: "fast-mode fingerprint ... byte-level verification must
    /// pass first"). Fuzzy-matched groups are never exact-digest-equal by
    /// construction, so fuzzy mode forces the same upgrade.
    pub fn requires_verification(&self) -> bool {
        self.fast_mode || self.verify_before_destructive || self.fuzzy_matching
    }
}

/// Persisted grouper output, sufficient to re-enter the pipeline at the
/// keep-select stage after an acknowledged interruption (spec §3, §6).
///
/// Stored as three sidecar files under [`RunConfig::resume_dir`]: a
/// key=value header, a length-prefixed binary record file of groups, and a
/// BLAKE3 checksum companion. All deleted on clean completion.
#[derive(Clone, Debug)]
pub struct ResumePoint {
    pub header_path: PathBuf,
    pub groups_path: PathBuf,
    pub checksum_path: PathBuf,
    pub groups: Vec<DigestGroup>,
    pub created_epoch: i64,
}

impl ResumePoint {
    pub fn new(resume_dir: &Path, groups: Vec<DigestGroup>, created_epoch: i64) -> Self {
        ResumePoint {
            header_path: resume_dir.join("resume.header"),
            groups_path: resume_dir.join("resume.groups"),
            checksum_path: resume_dir.join("resume.checksum"),
            groups,
            created_epoch,
        }
    }
}

/// Running totals maintained by the run controller (spec §4.8) and emitted
/// as the final `RunSummary`.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub files_discovered: u64,
    pub files_fingerprinted: u64,
    pub hash_errors: u64,
    pub groups_found: u64,
    pub bytes_wasted: u64,
    pub actions_attempted: u64,
    pub actions_succeeded: u64,
    pub bytes_reclaimed: u64,
}
