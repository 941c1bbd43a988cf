//! The append-only audit log (spec §6): one JSON-lines event per
//! `ActionOutcome` or gate rejection, ISO-8601 timestamps. Written only by
//! the run controller thread (spec §5 "Shared resources").

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ReasonCode;
use crate::types::ActionOutcome;

/// One audit-log line.
#[derive(Serialize)]
struct AuditEvent<'a> {
    timestamp: String,
    group_id: u32,
    path: &'a Path,
    intended: &'a str,
    effected: Option<&'a str>,
    bytes_reclaimed: u64,
    reason: Option<String>,
    backup_path: Option<&'a Path>,
    dry_run: bool,
}

pub struct AuditLog {
    file: File,
    path: PathBuf,
}

impl AuditLog {
    /// Open (creating if absent) the audit log for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create audit log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open audit log {}", path.display()))?;
        Ok(AuditLog {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one `ActionOutcome` as a JSON-lines event.
    pub fn record(&mut self, outcome: &ActionOutcome) -> Result<()> {
        let event = AuditEvent {
            timestamp: Utc::now().to_rfc3339(),
            group_id: outcome.group_id,
            path: &outcome.path,
            intended: action_kind_str(outcome.intended),
            effected: outcome.effected.map(action_kind_str),
            bytes_reclaimed: outcome.bytes_reclaimed,
            reason: outcome.failure_reason.map(|r| r.to_string()),
            backup_path: outcome.backup_path.as_deref(),
            dry_run: outcome.dry_run,
        };
        self.write_line(&event)
    }

    fn write_line(&mut self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(event).context("serialize audit event")?;
        writeln!(self.file, "{line}").context("append audit log line")?;
        self.file.flush().context("flush audit log")
    }
}

fn action_kind_str(kind: crate::types::ActionKind) -> &'static str {
    match kind {
        crate::types::ActionKind::Delete => "delete",
        crate::types::ActionKind::Trash => "trash",
        crate::types::ActionKind::Hardlink => "hardlink",
        crate::types::ActionKind::Quarantine => "quarantine",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let mut log = AuditLog::open(&log_path).unwrap();

        let outcome = ActionOutcome {
            path: PathBuf::from("/tmp/dup.txt"),
            group_id: 3,
            intended: crate::types::ActionKind::Delete,
            effected: Some(crate::types::ActionKind::Delete),
            bytes_reclaimed: 1024,
            failure_reason: None,
            backup_path: None,
            dry_run: false,
        };
        log.record(&outcome).unwrap();
        log.record(&ActionOutcome {
            path: PathBuf::from("/bin/ls"),
            group_id: 3,
            intended: crate::types::ActionKind::Delete,
            effected: None,
            bytes_reclaimed: 0,
            failure_reason: Some(ReasonCode::GateSystem),
            backup_path: None,
            dry_run: false,
        })
        .unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["bytes_reclaimed"], 1024);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["reason"], "gate.system");
    }
}
