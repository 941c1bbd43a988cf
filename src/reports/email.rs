//! Email delivery (spec §6): out-of-core collaborator. Composes a
//! plain-text summary and hands it to the system `sendmail`-compatible
//! binary — the spec explicitly scopes SMTP delivery outside the core
//! engine, so this is the thinnest correct adapter rather than a bundled
//! mail client.

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::process::{Command, Stdio};

use super::ReportData;

const SENDMAIL_BINARY: &str = "sendmail";

/// Compose the plain-text run summary for `to` and pipe it to `sendmail -t`.
pub fn send_summary(data: &ReportData, to: &str) -> Result<()> {
    let body = compose_summary(data, to);
    let mut child = Command::new(SENDMAIL_BINARY)
        .arg("-t")
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn `{SENDMAIL_BINARY}`"))?;
    child
        .stdin
        .take()
        .context("sendmail stdin unavailable")?
        .write_all(body.as_bytes())
        .context("write email body to sendmail")?;
    let status = child.wait().context("wait for sendmail")?;
    if !status.success() {
        bail!("sendmail exited with {status}");
    }
    Ok(())
}

pub fn compose_summary(data: &ReportData, to: &str) -> String {
    format!(
        "To: {to}\nSubject: dupctl run summary\n\n\
         {} group(s) found, {} byte(s) wasted, {} byte(s) reclaimed.\n\
         Files discovered: {}\nFiles fingerprinted: {}\nHash errors: {}\n\
         Actions attempted: {}\nActions succeeded: {}\n",
        data.groups.len(),
        data.summary.bytes_wasted,
        data.summary.bytes_reclaimed,
        data.summary.files_discovered,
        data.summary.files_fingerprinted,
        data.summary.hash_errors,
        data.summary.actions_attempted,
        data.summary.actions_succeeded,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Algorithm;
    use crate::types::{ActionKind, KeepStrategy, RunConfig, RunSummary};
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
    fn summary_includes_recipient_and_counters() {
        let cfg = base_config();
        let summary = RunSummary {
            bytes_reclaimed: 4096,
            ..Default::default()
        };
        let data = ReportData {
            tool_version: "test",
            generated_at_epoch: 0,
            roots: &[],
            summary: &summary,
            algorithm_tag: "md5",
            groups: &[],
            cfg: &cfg,
        };
        let body = compose_summary(&data, "ops@example.com");
        assert!(body.contains("To: ops@example.com"));
        assert!(body.contains("4096 byte(s) reclaimed"));
    }
}
