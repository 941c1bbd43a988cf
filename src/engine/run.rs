//! The run controller (C8, spec §4.8, §5): sequences every stage, owns the
//! cancellation flag, and produces the final [`RunSummary`] plus whatever
//! reports the operator asked for.
//!
//! Grounded on the teacher's `handle_run`/`setup_ctrlc_handler`/
//! `check_for_cancel`: same Ctrl+C-sets-an-`AtomicBool` idiom, generalized
//! from "flush the partial index" to "offer a resume point".

use anyhow::{Context, Result};
use kdam::Animation;
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::action::interactive::StdioPrompter;
use crate::action::resolve_group;
use crate::audit::AuditLog;
use crate::cache::Cache;
use crate::digest::DigestTag;
use crate::engine::progress::{ProgressBarConfig, create_progress_bar, flush_progress_remainder, report_progress_batched};
use crate::grouper::group_records;
use crate::hashing::{HashOutcome, compute_digest};
use crate::pipeline::{run_pipeline, shutdown_pipeline_handles};
use crate::reports::{self, ReportData};
use crate::resume;
use crate::types::{DigestGroup, FileRecord, ResumePoint, RunConfig, RunSummary};
use crate::utils::config::ProgressConsts;

/// Install a Ctrl+C handler and return the shared flag it sets.
pub fn setup_ctrlc_handler() -> Result<Arc<AtomicBool>> {
    let cancel_requested = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel_requested)
}

fn expected_tag(cfg: &RunConfig) -> DigestTag {
    if cfg.fast_mode {
        DigestTag::Fast
    } else {
        DigestTag::from(cfg.algorithm)
    }
}

fn open_cache(cfg: &RunConfig) -> Result<Cache> {
    match &cfg.cache_path {
        Some(path) => Cache::open(path, cfg.cache_retention_days, expected_tag(cfg)),
        None => Cache::open_in_memory(),
    }
}

/// Fingerprint every discovered record, consulting the cache first and
/// falling back to a fresh hash. Cancellable between records (spec §5
/// "cooperative cancellation").
fn fingerprint_all(
    cfg: &RunConfig,
    cache: &Cache,
    records: Vec<FileRecord>,
    cancel_requested: &Arc<AtomicBool>,
    summary: &mut RunSummary,
) -> Vec<FileRecord> {
    let chunk_size = ProgressConsts::PROGRESS_UPDATE_BATCH_SIZE;
    let progress = create_progress_bar(ProgressBarConfig::new(
        records.len(),
        "fingerprinting",
        Animation::Classic,
    ));
    let progress_counter = AtomicUsize::new(0);
    let mut processed = 0usize;

    let mut out = Vec::with_capacity(records.len());
    for mut record in records {
        if cancel_requested.load(Ordering::Relaxed) {
            break;
        }
        summary.files_discovered += 1;

        let digest = match cache.lookup(&record.path, record.size, record.mtime_ns) {
            Ok(Some(cached)) => Some(cached.digest),
            Ok(None) | Err(_) => None,
        };

        let digest = match digest {
            Some(d) => Some(d),
            None => match compute_digest(
                &record.path,
                record.size,
                cfg.algorithm,
                cfg.fast_mode,
                cfg.hash_timeout,
            ) {
                HashOutcome::Done(d) => {
                    if let Err(e) = cache.insert(&record.path, record.size, record.mtime_ns, &d) {
                        warn!("cache insert failed for {}: {e}", record.path.display());
                    }
                    Some(d)
                }
                HashOutcome::Timeout => {
                    warn!("hash timed out for {}", record.path.display());
                    summary.hash_errors += 1;
                    None
                }
                HashOutcome::Failed(e) => {
                    warn!("hash failed for {}: {e}", record.path.display());
                    summary.hash_errors += 1;
                    None
                }
            },
        };

        if digest.is_some() {
            summary.files_fingerprinted += 1;
        }
        record.digest = digest;
        out.push(record);
        processed += 1;
        report_progress_batched(Some(&progress), &progress_counter, chunk_size);
    }
    flush_progress_remainder(Some(&progress), processed, chunk_size);
    out
}

fn resolve_all_groups(
    cfg: &RunConfig,
    groups: &[DigestGroup],
    audit: &mut AuditLog,
    cancel_requested: &Arc<AtomicBool>,
    summary: &mut RunSummary,
) {
    let mut froze_action = false;
    let mut prompter = StdioPrompter;
    for group in groups {
        if cancel_requested.load(Ordering::Relaxed) {
            break;
        }
        let use_interactive = cfg.interactive && !froze_action;
        let (outcomes, froze_here) = resolve_group(
            cfg,
            group,
            if use_interactive {
                Some(&mut prompter as &mut dyn crate::action::interactive::Prompter)
            } else {
                None
            },
        );
        froze_action |= froze_here;

        summary.bytes_wasted += group.wasted_space();
        for outcome in &outcomes {
            summary.actions_attempted += 1;
            if outcome.succeeded() {
                summary.actions_succeeded += 1;
                summary.bytes_reclaimed += outcome.bytes_reclaimed;
            }
            if let Err(e) = audit.record(outcome) {
                warn!("audit log write failed: {e}");
            }
        }
    }
}

fn write_reports(cfg: &RunConfig, groups: &[DigestGroup], summary: &RunSummary, generated_at_epoch: i64) {
    let algorithm_tag = if cfg.fast_mode {
        "fast"
    } else {
        DigestTag::from(cfg.algorithm).as_str()
    };
    let data = ReportData {
        tool_version: env!("CARGO_PKG_VERSION"),
        generated_at_epoch,
        roots: &cfg.roots,
        summary,
        algorithm_tag,
        groups,
        cfg,
    };

    if let Some(path) = &cfg.report_csv
        && let Err(e) = reports::csv::write_report(&data, path)
    {
        warn!("CSV report failed: {e}");
    }
    if let Some(path) = &cfg.report_json
        && let Err(e) = reports::json::write_report(&data, path)
    {
        warn!("JSON report failed: {e}");
    }
    if let Some(path) = &cfg.report_html
        && let Err(e) = reports::html::write_report(&data, path)
    {
        warn!("HTML report failed: {e}");
    }
    if let Some(to) = &cfg.email_to
        && let Err(e) = reports::email::send_summary(&data, to)
    {
        warn!("email report failed: {e}");
    }
}

/// Run the whole pipeline: walk, fingerprint, group, resolve, report.
/// Resumes from a persisted [`ResumePoint`] instead of re-walking when
/// `cfg.roots`'s resume marker is present and the caller asked for it.
pub fn run(cfg: &RunConfig, resume_requested: bool) -> Result<RunSummary> {
    let cancel_requested = setup_ctrlc_handler()?;
    let mut summary = RunSummary::default();

    let groups = if resume_requested && cfg.resume_dir.join("resume.header").exists() {
        info!("resuming from {}", cfg.resume_dir.display());
        let point = resume::load(&cfg.resume_dir).context("load resume point")?;
        point.groups
    } else {
        let cache = open_cache(cfg)?;
        let handles = run_pipeline(cfg, cache.connection())?;

        let mut records = Vec::new();
        while let Ok(record) = handles.record_rx.recv() {
            records.push(record);
            if cancel_requested.load(Ordering::Relaxed) {
                break;
            }
        }
        shutdown_pipeline_handles(handles.walk_handles, handles.worker_handles)?;

        let fingerprinted = fingerprint_all(cfg, &cache, records, &cancel_requested, &mut summary);

        if cancel_requested.load(Ordering::Relaxed) {
            let epoch = chrono::Utc::now().timestamp();
            let (groups, _stats) = group_records(fingerprinted);
            let point = ResumePoint::new(&cfg.resume_dir, groups, epoch);
            resume::persist(&point).context("persist resume point on cancellation")?;
            return Err(anyhow::Error::new(crate::error::Cancelled).context(format!(
                "resume point written to {}",
                cfg.resume_dir.display()
            )));
        }

        let (mut groups, stats) = group_records(fingerprinted);
        if cfg.fuzzy_matching {
            let mut next_id = groups.len() as u32;
            let provider = crate::similarity::SizeProximity {
                threshold_percent: cfg.fuzzy_threshold_percent,
            };
            groups.extend(crate::similarity::group_by_similarity(
                stats.singletons,
                &provider,
                &mut next_id,
            ));
        }
        summary.groups_found = groups.len() as u64;
        groups
    };

    let audit_path = cfg
        .audit_log_path
        .clone()
        .unwrap_or_else(|| cfg.resume_dir.join("audit.jsonl"));
    let mut audit = AuditLog::open(&audit_path)?;

    resolve_all_groups(cfg, &groups, &mut audit, &cancel_requested, &mut summary);

    if cancel_requested.load(Ordering::Relaxed) {
        return Err(anyhow::Error::new(crate::error::Cancelled).context("cancelled during resolution"));
    }

    let generated_at_epoch = chrono::Utc::now().timestamp();
    write_reports(cfg, &groups, &summary, generated_at_epoch);

    if cfg.resume_dir.join("resume.header").exists() {
        let point = ResumePoint::new(&cfg.resume_dir, Vec::new(), 0);
        let _ = resume::clear(&point);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Algorithm;
    use crate::types::{ActionKind, KeepStrategy};
    use std::time::Duration;

    fn base_config(tmp: &std::path::Path) -> RunConfig {
        RunConfig {
            roots: vec![tmp.to_path_buf()],
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
            hash_timeout: Duration::from_secs(5),
            fuzzy_matching: false,
            fuzzy_threshold_percent: 0.0,
            keep_strategy: KeepStrategy::Default,
            action: ActionKind::Delete,
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
            num_threads: Some(1),
            report_csv: None,
            report_json: None,
            report_html: None,
            email_to: None,
            audit_log_path: Some(tmp.join("audit.jsonl")),
            resume_dir: tmp.to_path_buf(),
            verbose: false,
        }
    }

    #[test]
    fn dry_run_over_a_duplicate_pair_finds_one_group_and_no_mutation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"same content").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"same content").unwrap();

        let cfg = base_config(dir.path());
        let summary = run(&cfg, false).unwrap();

        assert_eq!(summary.groups_found, 1);
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("b.txt").exists());
    }

    #[test]
    fn unique_files_produce_no_groups() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"one").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"two").unwrap();

        let cfg = base_config(dir.path());
        let summary = run(&cfg, false).unwrap();

        assert_eq!(summary.groups_found, 0);
    }
}
