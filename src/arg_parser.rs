//! The command-line surface (spec §6): a `clap` derive struct mirroring the
//! flag table one-for-one, merged with the configuration file and compiled
//! defaults into a frozen [`RunConfig`] (defaults → config file → CLI, the
//! teacher's `setup_opts` merge order).

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::store::DEFAULT_RETENTION_DAYS;
use crate::config_file::{ConfigFile, parse_size_with_suffix};
use crate::digest::Algorithm;
use crate::types::{ActionKind, KeepStrategy, RunConfig};

/// `dupctl`: concurrent duplicate-file scanner and resolver.
#[derive(Clone, Parser, Debug)]
#[command(name = "dupctl")]
#[command(about = "Find and resolve duplicate files under one or more roots.")]
pub struct Cli {
    /// Root directory to scan. Repeatable.
    #[arg(long = "path", value_name = "P")]
    pub path: Vec<PathBuf>,

    /// Reports and audit directory.
    #[arg(long, value_name = "D")]
    pub output: Option<PathBuf>,

    /// Exclude a subtree from the walk. Repeatable.
    #[arg(long, value_name = "P")]
    pub exclude: Vec<String>,

    /// A file listing one exclude pattern per line, merged with `--exclude`.
    #[arg(long = "exclude-list", value_name = "F")]
    pub exclude_list: Option<PathBuf>,

    /// Minimum file size, accepts K/M/G/T suffixes with optional trailing B.
    #[arg(long = "min-size", value_name = "N")]
    pub min_size: Option<String>,

    /// Maximum file size, same suffix grammar as `--min-size`.
    #[arg(long = "max-size", value_name = "N")]
    pub max_size: Option<String>,

    /// Basename glob filter. Repeatable.
    #[arg(long = "pattern", value_name = "G")]
    pub pattern: Vec<String>,

    /// Maximum traversal depth.
    #[arg(long = "level", value_name = "N")]
    pub level: Option<usize>,

    #[arg(long = "follow-symlinks")]
    pub follow_symlinks: bool,

    /// Include hidden files and directories.
    #[arg(long)]
    pub all: bool,

    /// Include zero-length files.
    #[arg(long)]
    pub empty: bool,

    /// Fast fingerprint: size + BLAKE3 over the first 64 KiB only.
    #[arg(long)]
    pub fast: bool,

    /// Force byte-level verification before any destructive action, even
    /// outside fast mode.
    #[arg(long)]
    pub verify: bool,

    /// Enable near-identical (not just byte-identical) matching.
    #[arg(long)]
    pub fuzzy: bool,

    /// Similarity threshold for `--fuzzy` (provider-specific).
    #[arg(long, value_name = "P")]
    pub threshold: Option<String>,

    #[arg(long)]
    pub delete: bool,

    #[arg(long)]
    pub interactive: bool,

    #[arg(long = "dry-run")]
    pub dry_run: bool,

    #[arg(long)]
    pub trash: bool,

    #[arg(long)]
    pub hardlink: bool,

    /// Move non-survivors into D instead of destroying them.
    #[arg(long, value_name = "D")]
    pub quarantine: Option<PathBuf>,

    #[arg(long = "keep-newest")]
    pub keep_newest: bool,

    #[arg(long = "keep-oldest")]
    pub keep_oldest: bool,

    /// Prefer the survivor whose path starts with P.
    #[arg(long = "keep-path", value_name = "P")]
    pub keep_path: Option<PathBuf>,

    /// Use the configured location-priority table instead of a fixed rule.
    #[arg(long = "smart-delete")]
    pub smart_delete: bool,

    /// Worker thread count. Default: drive-type-aware auto-detection.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Path to the fingerprint cache database.
    #[arg(long, value_name = "F")]
    pub cache: Option<PathBuf>,

    #[arg(long)]
    pub sha256: bool,

    #[arg(long)]
    pub sha512: bool,

    /// Drop system-protected targets from the run quietly, without an
    /// audit-log entry for each one (the gate still refuses them).
    #[arg(long = "skip-system")]
    pub skip_system: bool,

    /// Allow the system-root refusal to be overridden with an interactive
    /// confirmation token; never-delete-glob and critical-extension
    /// refusals are never overridden. Non-interactively the override is
    /// always refused.
    #[arg(long = "force-system")]
    pub force_system: bool,

    /// Copy every target here before a destructive action.
    #[arg(long, value_name = "D")]
    pub backup: Option<PathBuf>,

    #[arg(long = "csv", value_name = "F")]
    pub csv: Option<PathBuf>,

    #[arg(long = "json", value_name = "F")]
    pub json: Option<PathBuf>,

    #[arg(long = "email", value_name = "A")]
    pub email: Option<String>,

    #[arg(long = "log", value_name = "F")]
    pub log: Option<PathBuf>,

    #[arg(long, short = 'v')]
    pub verbose: bool,

    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Resume a prior interrupted run instead of starting a fresh walk.
    #[arg(long)]
    pub resume: bool,

    /// Load defaults from a key=value config file before applying CLI flags.
    #[arg(long, value_name = "F")]
    pub config: Option<PathBuf>,
}

/// Merge compiled defaults, an optional config file, and CLI flags (in that
/// priority order, CLI winning) into a frozen [`RunConfig`].
pub fn build_run_config(cli: &Cli) -> Result<RunConfig> {
    let file = match &cli.config {
        Some(path) => ConfigFile::parse(path)?,
        None => ConfigFile::default(),
    };

    let roots = merge_paths(&cli.path, file.all("path"));
    if roots.is_empty() {
        bail!("at least one --path root is required");
    }

    let mut exclude_globs = merge_strings(&cli.exclude, file.all("exclude"));
    if let Some(list_path) = &cli.exclude_list {
        exclude_globs.extend(read_exclude_list(list_path)?);
    }

    let include_globs = merge_strings(&cli.pattern, file.all("pattern"));

    let min_size = resolve_size(cli.min_size.as_deref(), file.get("min-size"))?.unwrap_or(0);
    let max_size = resolve_size(cli.max_size.as_deref(), file.get("max-size"))?;

    let max_depth = cli.level.or_else(|| file.get("level").and_then(|v| v.parse().ok()));

    let follow_symlinks = cli.follow_symlinks || file.flag("follow-symlinks");
    let include_hidden = cli.all || file.flag("all");
    let include_empty_files = cli.empty || file.flag("empty");
    let fast_mode = cli.fast || file.flag("fast");
    let verify_before_destructive = cli.verify || file.flag("verify");

    let fuzzy_matching = cli.fuzzy || file.flag("fuzzy");
    let fuzzy_threshold_percent =
        resolve_fuzzy_threshold(cli.threshold.as_deref(), file.get("threshold"))?;

    let sha512 = cli.sha512 || file.flag("sha512");
    let sha256 = cli.sha256 || file.flag("sha256");
    let algorithm = if sha512 {
        Algorithm::Sha512
    } else if sha256 {
        Algorithm::Sha256
    } else {
        Algorithm::Md5
    };

    let keep_strategy = resolve_keep_strategy(cli, &file);
    let (action, dry_run) = resolve_action(cli, &file);

    let threads = cli.threads.or_else(|| file.get("threads").and_then(|v| v.parse().ok()));
    let cache_path = cli.cache.clone().or_else(|| file.get("cache").map(PathBuf::from));

    let quarantine_dir = cli
        .quarantine
        .clone()
        .or_else(|| file.get("quarantine").map(PathBuf::from));
    let backup_dir = cli.backup.clone().or_else(|| file.get("backup").map(PathBuf::from));

    let system_roots = Vec::new();
    let never_delete_globs = Vec::new();
    let critical_extensions = Vec::new();
    let skip_system = cli.skip_system || file.flag("skip-system");
    let force_system = cli.force_system || file.flag("force-system");

    let output_dir = cli.output.clone().or_else(|| file.get("output").map(PathBuf::from));
    let report_csv = cli.csv.clone().or_else(|| file.get("csv").map(PathBuf::from));
    let report_json = cli.json.clone().or_else(|| file.get("json").map(PathBuf::from));
    let report_html = output_dir.as_ref().map(|d| d.join("duplicates.html"));
    let email_to = cli.email.clone().or_else(|| file.get("email").map(String::from));
    let audit_log_path = cli
        .log
        .clone()
        .or_else(|| file.get("log").map(PathBuf::from))
        .or_else(|| output_dir.as_ref().map(|d| d.join("audit.jsonl")));

    let resume_dir = output_dir.clone().unwrap_or_else(std::env::temp_dir);

    let verbose = cli.verbose || file.flag("verbose");
    let quiet = cli.quiet || file.flag("quiet");
    if verbose && quiet {
        bail!("--verbose and --quiet are mutually exclusive");
    }

    Ok(RunConfig {
        roots,
        include_globs,
        exclude_globs,
        min_size,
        max_size,
        max_depth,
        include_hidden,
        follow_symlinks,
        include_empty_files,
        algorithm,
        fast_mode,
        hash_timeout: Duration::from_secs(30),
        fuzzy_matching,
        fuzzy_threshold_percent,
        keep_strategy,
        action,
        trash_fallback_to_delete: false,
        quarantine_dir,
        backup_dir,
        system_roots,
        never_delete_globs,
        critical_extensions,
        skip_system,
        force_system,
        dry_run,
        interactive: cli.interactive || file.flag("interactive"),
        verify_before_destructive,
        cache_path,
        cache_retention_days: DEFAULT_RETENTION_DAYS,
        num_threads: threads,
        report_csv,
        report_json,
        report_html,
        email_to,
        audit_log_path,
        resume_dir,
        verbose,
    })
}

fn merge_paths(cli_values: &[PathBuf], file_values: &[String]) -> Vec<PathBuf> {
    if !cli_values.is_empty() {
        cli_values.to_vec()
    } else {
        file_values.iter().map(PathBuf::from).collect()
    }
}

fn merge_strings(cli_values: &[String], file_values: &[String]) -> Vec<String> {
    if !cli_values.is_empty() {
        cli_values.to_vec()
    } else {
        file_values.to_vec()
    }
}

fn resolve_size(cli_value: Option<&str>, file_value: Option<&str>) -> Result<Option<u64>> {
    match cli_value.or(file_value) {
        Some(v) => parse_size_with_suffix(v).map(Some),
        None => Ok(None),
    }
}

/// Default `SizeProximity` tolerance when `--fuzzy` is set without an
/// explicit `--threshold=P`.
const DEFAULT_FUZZY_THRESHOLD_PERCENT: f64 = 5.0;

fn resolve_fuzzy_threshold(cli_value: Option<&str>, file_value: Option<&str>) -> Result<f64> {
    match cli_value.or(file_value) {
        Some(v) => v
            .parse::<f64>()
            .with_context(|| format!("invalid --threshold value: {v}")),
        None => Ok(DEFAULT_FUZZY_THRESHOLD_PERCENT),
    }
}

fn resolve_keep_strategy(cli: &Cli, file: &ConfigFile) -> KeepStrategy {
    if let Some(prefix) = cli.keep_path.clone().or_else(|| file.get("keep-path").map(PathBuf::from)) {
        return KeepStrategy::KeepPath(prefix);
    }
    if cli.keep_newest || file.flag("keep-newest") {
        return KeepStrategy::Newest;
    }
    if cli.keep_oldest || file.flag("keep-oldest") {
        return KeepStrategy::Oldest;
    }
    if cli.smart_delete || file.flag("smart-delete") {
        return KeepStrategy::Smart(Vec::new());
    }
    KeepStrategy::Default
}

/// Action selection plus the dry-run flag. No destructive flag at all is
/// treated as a report-only dry run (DESIGN.md Open Question decision: an
/// operator must opt into mutation explicitly).
fn resolve_action(cli: &Cli, file: &ConfigFile) -> (ActionKind, bool) {
    let explicit_dry_run = cli.dry_run || file.flag("dry-run");
    if cli.trash || file.flag("trash") {
        (ActionKind::Trash, explicit_dry_run)
    } else if cli.hardlink || file.flag("hardlink") {
        (ActionKind::Hardlink, explicit_dry_run)
    } else if cli.quarantine.is_some() || file.get("quarantine").is_some() {
        (ActionKind::Quarantine, explicit_dry_run)
    } else if cli.delete || file.flag("delete") {
        (ActionKind::Delete, explicit_dry_run)
    } else {
        (ActionKind::Delete, true)
    }
}

fn read_exclude_list(path: &PathBuf) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read exclude list {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_path(path: &str) -> Cli {
        Cli {
            path: vec![PathBuf::from(path)],
            output: None,
            exclude: vec![],
            exclude_list: None,
            min_size: None,
            max_size: None,
            pattern: vec![],
            level: None,
            follow_symlinks: false,
            all: false,
            empty: false,
            fast: false,
            verify: false,
            fuzzy: false,
            threshold: None,
            delete: false,
            interactive: false,
            dry_run: false,
            trash: false,
            hardlink: false,
            quarantine: None,
            keep_newest: false,
            keep_oldest: false,
            keep_path: None,
            smart_delete: false,
            threads: None,
            cache: None,
            sha256: false,
            sha512: false,
            skip_system: false,
            force_system: false,
            backup: None,
            csv: None,
            json: None,
            email: None,
            log: None,
            verbose: false,
            quiet: false,
            resume: false,
            config: None,
        }
    }

    #[test]
    fn absent_destructive_flags_default_to_dry_run() {
        let cli = cli_with_path("/tmp");
        let cfg = build_run_config(&cli).unwrap();
        assert!(cfg.dry_run);
        assert_eq!(cfg.action, ActionKind::Delete);
    }

    #[test]
    fn delete_flag_without_dry_run_actually_mutates() {
        let mut cli = cli_with_path("/tmp");
        cli.delete = true;
        let cfg = build_run_config(&cli).unwrap();
        assert!(!cfg.dry_run);
        assert_eq!(cfg.action, ActionKind::Delete);
    }

    #[test]
    fn sha512_takes_priority_over_sha256() {
        let mut cli = cli_with_path("/tmp");
        cli.sha256 = true;
        cli.sha512 = true;
        let cfg = build_run_config(&cli).unwrap();
        assert_eq!(cfg.algorithm, Algorithm::Sha512);
    }

    #[test]
    fn keep_path_takes_priority_over_keep_newest() {
        let mut cli = cli_with_path("/tmp");
        cli.keep_newest = true;
        cli.keep_path = Some(PathBuf::from("/keep"));
        let cfg = build_run_config(&cli).unwrap();
        assert!(matches!(cfg.keep_strategy, KeepStrategy::KeepPath(p) if p == PathBuf::from("/keep")));
    }

    #[test]
    fn missing_path_is_rejected() {
        let cli = cli_with_path("");
        let mut cli = cli;
        cli.path.clear();
        assert!(build_run_config(&cli).is_err());
    }

    #[test]
    fn fuzzy_without_threshold_uses_the_compiled_in_default() {
        let mut cli = cli_with_path("/tmp");
        cli.fuzzy = true;
        let cfg = build_run_config(&cli).unwrap();
        assert!(cfg.fuzzy_matching);
        assert_eq!(cfg.fuzzy_threshold_percent, DEFAULT_FUZZY_THRESHOLD_PERCENT);
    }

    #[test]
    fn explicit_threshold_overrides_the_default() {
        let mut cli = cli_with_path("/tmp");
        cli.fuzzy = true;
        cli.threshold = Some("12.5".to_string());
        let cfg = build_run_config(&cli).unwrap();
        assert_eq!(cfg.fuzzy_threshold_percent, 12.5);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let mut cli = cli_with_path("/tmp");
        cli.threshold = Some("not-a-number".to_string());
        assert!(build_run_config(&cli).is_err());
    }

    #[test]
    fn skip_system_and_force_system_are_off_by_default() {
        let cli = cli_with_path("/tmp");
        let cfg = build_run_config(&cli).unwrap();
        assert!(!cfg.skip_system);
        assert!(!cfg.force_system);
    }

    #[test]
    fn skip_system_and_force_system_flags_propagate() {
        let mut cli = cli_with_path("/tmp");
        cli.skip_system = true;
        cli.force_system = true;
        let cfg = build_run_config(&cli).unwrap();
        assert!(cfg.skip_system);
        assert!(cfg.force_system);
    }
}
