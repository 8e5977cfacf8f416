//! Output for humans and for automation.

use crate::resource::{CleanResult, ResourceSummary, ScanResult};
use crate::size::format_bytes;
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;

/// Machine-readable document printed by `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport<'a> {
    pub summaries: &'a [ResourceSummary],
    pub total_reclaimable_bytes: u64,
    pub total_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<&'a CleanResult>,
}

impl<'a> ScanReport<'a> {
    pub fn new(scan: &'a ScanResult, cleanup: Option<&'a CleanResult>) -> Self {
        ScanReport {
            summaries: &scan.summaries,
            total_reclaimable_bytes: scan.total_reclaimable_bytes,
            total_items: scan.total_items(),
            cleanup,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Truncate a name with "..." suffix if it exceeds max_width
pub fn truncate_name_with_suffix(name: &str, max_width: usize) -> String {
    if name.chars().count() <= max_width {
        name.to_string()
    } else if max_width >= 3 {
        let kept: String = name.chars().take(max_width - 3).collect();
        format!("{}...", kept)
    } else {
        "...".to_string()
    }
}

const NAME_WIDTH: usize = 48;

/// Scan summary as printed to the terminal.
pub fn render_scan(scan: &ScanResult, verbose: bool) -> String {
    let mut out = String::new();

    for summary in &scan.summaries {
        let header = format!(
            "{} ({} found, {})",
            summary.label,
            summary.items.len(),
            format_bytes(summary.reclaimable_bytes)
        );
        let _ = writeln!(out, "{}", header.bold());

        for item in &summary.items {
            let name = if item.name.is_empty() {
                short_id(&item.id)
            } else {
                item.name.clone()
            };
            let size = item.size.as_deref().unwrap_or("-");
            let _ = write!(
                out,
                "  - {:<width$} {:>10}",
                truncate_name_with_suffix(&name, NAME_WIDTH),
                size,
                width = NAME_WIDTH
            );
            if verbose {
                if let Some(status) = &item.last_used {
                    let _ = write!(out, "  {}", status.dimmed());
                }
            }
            out.push('\n');
        }
    }

    let _ = writeln!(out, "========================================");
    let _ = writeln!(
        out,
        "Total reclaimable: {}",
        format_bytes(scan.total_reclaimable_bytes).bold()
    );
    out
}

/// Cleanup result as printed to the terminal.
pub fn render_clean(result: &CleanResult, dry_run: bool) -> String {
    let mut out = String::new();

    if dry_run {
        let _ = writeln!(out, "Dry run mode: nothing was removed.");
        return out;
    }

    for outcome in &result.outcomes {
        if outcome.failures.is_empty() {
            let _ = writeln!(out, "  {}: removed {}", outcome.kind, outcome.removed);
        } else {
            for failure in &outcome.failures {
                let _ = writeln!(out, "  {}: {}", outcome.kind, failure.red());
            }
        }
    }

    let _ = writeln!(
        out,
        "Total reclaimed: {}",
        format_bytes(result.reclaimed_bytes).bold().green()
    );
    out
}

fn short_id(id: &str) -> String {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.chars().take(12).collect()
}
