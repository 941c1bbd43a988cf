//! HTML report: a minimal hand-written template, one `format!`-driven
//! string builder — no templating-engine dependency for a single static
//! layout (DESIGN.md).

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use crate::gate::is_system_root;

use super::ReportData;

pub fn write_report(data: &ReportData, out_path: &Path) -> Result<()> {
    let mut body = String::new();
    let _ = writeln!(body, "<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    let _ = writeln!(body, "<title>dupctl report</title></head><body>");
    let _ = writeln!(
        body,
        "<h1>dupctl report — {} group(s), {} byte(s) wasted</h1>",
        data.groups.len(),
        data.summary.bytes_wasted
    );
    let _ = writeln!(body, "<p>algorithm: {}</p>", data.algorithm_tag);
    let _ = writeln!(body, "<table border=\"1\"><tr><th>group</th><th>path</th><th>size</th><th>system</th></tr>");
    for group in data.groups {
        for record in &group.records {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                group.id,
                html_escape(&record.path.to_string_lossy()),
                record.size,
                is_system_root(data.cfg, &record.path),
            );
        }
    }
    let _ = writeln!(body, "</table></body></html>");

    std::fs::write(out_path, body)
        .with_context(|| format!("write HTML report {}", out_path.display()))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
