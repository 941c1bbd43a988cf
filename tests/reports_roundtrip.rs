//! Report round-trip (spec §8): the JSON report parses and, when re-grouped
//! by its own `digest` field, reproduces the groups the run actually found.

use dupctl::digest::Algorithm;
use dupctl::engine::run::run;
use dupctl::types::{ActionKind, KeepStrategy, RunConfig};
use std::collections::HashMap;
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
        num_threads: Some(2),
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
fn json_report_regroups_to_the_same_digest_sets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"group one").unwrap();
    std::fs::write(dir.path().join("b.txt"), b"group one").unwrap();
    std::fs::write(dir.path().join("c.txt"), b"group two content").unwrap();
    std::fs::write(dir.path().join("d.txt"), b"group two content").unwrap();
    std::fs::write(dir.path().join("e.txt"), b"group two content").unwrap();
    std::fs::write(dir.path().join("solo.txt"), b"unique, no duplicate here").unwrap();

    let mut cfg = base_config(dir.path());
    cfg.report_json = Some(dir.path().join("report.json"));

    let summary = run(&cfg, false).unwrap();
    assert_eq!(summary.groups_found, 2);

    let contents = std::fs::read_to_string(cfg.report_json.as_ref().unwrap()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let groups = parsed["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);

    let mut by_digest: HashMap<String, usize> = HashMap::new();
    for group in groups {
        let digest = group["digest"].as_str().unwrap().to_string();
        let file_count = group["files"].as_array().unwrap().len();
        *by_digest.entry(digest).or_insert(0) += file_count;
    }
    let mut sizes: Vec<usize> = by_digest.into_values().collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![2, 3]);
}
