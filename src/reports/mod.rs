//! Report generation (spec §6): HTML / CSV / JSON, written into the output
//! directory as `duplicates_<UTC timestamp>.<ext>`. Treated as an external
//! collaborator of the core engine — consumes finished `DigestGroup`s, never
//! feeds back into the pipeline.

pub mod csv;
pub mod email;
pub mod html;
pub mod json;

use std::path::PathBuf;

use crate::types::{DigestGroup, RunConfig, RunSummary};

/// Everything a report writer needs, gathered once after the run completes.
pub struct ReportData<'a> {
    pub tool_version: &'static str,
    pub generated_at_epoch: i64,
    pub roots: &'a [PathBuf],
    pub summary: &'a RunSummary,
    pub algorithm_tag: &'static str,
    pub groups: &'a [DigestGroup],
    pub cfg: &'a RunConfig,
}

/// `duplicates_<UTC timestamp>.<ext>`, per spec §6's persisted-state layout.
pub fn report_file_name(generated_at_epoch: i64, ext: &str) -> String {
    let timestamp = chrono::DateTime::from_timestamp(generated_at_epoch, 0)
        .unwrap_or_default()
        .format("%Y%m%dT%H%M%SZ");
    format!("duplicates_{timestamp}.{ext}")
}
