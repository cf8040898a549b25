//! Rendering of a finished migration run for stdout.
//!
//! The human form follows the other command summaries: a header line,
//! indented counters, details, and a trailing `ok`. In preview mode every
//! planned document is listed with the fields that would be set.

use std::fmt::Write;

use anyhow::{Context, Result};

use media_relink_core::execute::ExecutionMode;

use crate::migrate::MigrationRun;

pub fn render_human(run: &MigrationRun, dataset: &str) -> String {
    let summary = &run.summary;
    let preview = run.report.mode == ExecutionMode::Preview;
    let mut out = String::new();

    if preview {
        let _ = writeln!(out, "migrate {} (dry-run)", dataset);
    } else {
        let _ = writeln!(out, "migrate {}", dataset);
    }
    let _ = writeln!(out, "  assets scanned: {}", summary.assets_scanned);
    let _ = writeln!(out, "  assets resolved: {}", summary.assets_resolved);
    let _ = writeln!(out, "  assets skipped: {}", summary.assets_skipped);
    for skipped in &run.skipped {
        let _ = writeln!(
            out,
            "    {}  {}  {}",
            skipped.asset_id, skipped.code, skipped.reason
        );
    }
    let _ = writeln!(out, "  documents touched: {}", summary.documents_touched);
    let _ = writeln!(
        out,
        "  operations: {} (asset: {}, media: {})",
        summary.total_operations, summary.asset_operations, summary.media_operations
    );

    if preview {
        for changes in &run.report.documents {
            let _ = writeln!(out, "  {}", changes.document_id);
            for op in &changes.operations {
                let _ = writeln!(out, "    set {} -> {}", op.path, op.replacement.target);
            }
        }
    } else {
        let _ = writeln!(out, "  documents applied: {}", summary.documents_applied);
        let _ = writeln!(out, "  documents failed: {}", summary.documents_failed);
        for failed in &run.report.failed {
            let _ = writeln!(out, "    {}  {}", failed.document_id, failed.error);
        }
    }

    out.push_str("ok\n");
    out
}

pub fn render_json(run: &MigrationRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("Failed to serialize migration report")
}
