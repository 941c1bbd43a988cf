//! CSV report (spec §6): columns in order `digest, path, size-bytes,
//! size-human, group-id, is-system-flag`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::gate::is_system_root;

use super::ReportData;

#[derive(Serialize)]
struct CsvRow<'a> {
    digest: String,
    path: &'a str,
    #[serde(rename = "size-bytes")]
    size_bytes: u64,
    #[serde(rename = "size-human")]
    size_human: String,
    #[serde(rename = "group-id")]
    group_id: u32,
    #[serde(rename = "is-system-flag")]
    is_system_flag: bool,
}

pub fn write_report(data: &ReportData, out_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(out_path)
        .with_context(|| format!("create CSV report {}", out_path.display()))?;
    for group in data.groups {
        for record in &group.records {
            let row = CsvRow {
                digest: record
                    .digest
                    .as_ref()
                    .map(|d| to_hex(&d.key().1))
                    .unwrap_or_default(),
                path: &record.path.to_string_lossy(),
                size_bytes: record.size,
                size_human: human_size(record.size),
                group_id: group.id,
                is_system_flag: is_system_root(data.cfg, &record.path),
            };
            writer.serialize(row).context("write CSV row")?;
        }
    }
    writer.flush().context("flush CSV report")
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
