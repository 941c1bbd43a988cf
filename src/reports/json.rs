//! JSON report (spec §6): a top-level object with `metadata` and `groups`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::gate::is_system_root;

use super::ReportData;

#[derive(Serialize)]
struct JsonReport {
    metadata: Metadata,
    groups: Vec<JsonGroup>,
}

#[derive(Serialize)]
struct Metadata {
    tool_version: &'static str,
    generated_at: String,
    roots: Vec<String>,
    counters: Counters,
    algorithm: &'static str,
    protected: bool,
}

#[derive(Serialize)]
struct Counters {
    files_discovered: u64,
    files_fingerprinted: u64,
    hash_errors: u64,
    groups_found: u64,
    bytes_wasted: u64,
    actions_attempted: u64,
    actions_succeeded: u64,
    bytes_reclaimed: u64,
}

#[derive(Serialize)]
struct JsonGroup {
    id: u32,
    digest: String,
    files: Vec<JsonFile>,
}

#[derive(Serialize)]
struct JsonFile {
    path: String,
    size: u64,
    system: bool,
}

pub fn write_report(data: &ReportData, out_path: &Path) -> Result<()> {
    let report = JsonReport {
        metadata: Metadata {
            tool_version: data.tool_version,
            generated_at: chrono::DateTime::from_timestamp(data.generated_at_epoch, 0)
                .unwrap_or_default()
                .to_rfc3339(),
            roots: data
                .roots
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            counters: Counters {
                files_discovered: data.summary.files_discovered,
                files_fingerprinted: data.summary.files_fingerprinted,
                hash_errors: data.summary.hash_errors,
                groups_found: data.summary.groups_found,
                bytes_wasted: data.summary.bytes_wasted,
                actions_attempted: data.summary.actions_attempted,
                actions_succeeded: data.summary.actions_succeeded,
                bytes_reclaimed: data.summary.bytes_reclaimed,
            },
            algorithm: data.algorithm_tag,
            protected: !data.cfg.system_roots.is_empty()
                || !data.cfg.never_delete_globs.is_empty()
                || !data.cfg.critical_extensions.is_empty(),
        },
        groups: data
            .groups
            .iter()
            .map(|group| JsonGroup {
                id: group.id,
                digest: group
                    .records
                    .first()
                    .and_then(|r| r.digest.as_ref())
                    .map(|d| super::csv::to_hex(&d.key().1))
                    .unwrap_or_default(),
                files: group
                    .records
                    .iter()
                    .map(|r| JsonFile {
                        path: r.path.to_string_lossy().into_owned(),
                        size: r.size,
                        system: is_system_root(data.cfg, &r.path),
                    })
                    .collect(),
            })
            .collect(),
    };
    let file = std::fs::File::create(out_path)
        .with_context(|| format!("create JSON report {}", out_path.display()))?;
    serde_json::to_writer_pretty(file, &report).context("write JSON report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Algorithm, Digest};
    use crate::types::{ActionKind, DigestGroup, FileRecord, KeepStrategy, RunConfig, RunSummary};
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

    #[test]
    fn emits_metadata_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("report.json");
        let cfg = base_config();
        let summary = RunSummary {
            groups_found: 1,
            ..Default::default()
        };
        let groups = vec![DigestGroup {
            id: 0,
            records: vec![
                FileRecord::new(PathBuf::from("/a"), 4, 0, 1).with_digest(Digest::Strong {
                    algorithm: Algorithm::Md5,
                    bytes: vec![0xde, 0xad],
                }),
                FileRecord::new(PathBuf::from("/b"), 4, 0, 1).with_digest(Digest::Strong {
                    algorithm: Algorithm::Md5,
                    bytes: vec![0xde, 0xad],
                }),
            ],
        }];
        let data = ReportData {
            tool_version: "test",
            generated_at_epoch: 0,
            roots: &[],
            summary: &summary,
            algorithm_tag: "md5",
            groups: &groups,
            cfg: &cfg,
        };
        write_report(&data, &out_path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(parsed["metadata"]["algorithm"], "md5");
        assert_eq!(parsed["groups"][0]["files"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["groups"][0]["digest"], "dead");
    }
}
