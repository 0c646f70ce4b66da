//! Markdown summary generation
//!
//! Writes a human-readable summary of a run: totals, the page cap, and
//! every failed or skipped Target.

use crate::output::report::{CrawlReport, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Failed Targets listed in full before the table is truncated
const MAX_FAILURES_LISTED: usize = 100;

/// Writes a markdown summary of `report` to `output_path`
///
/// # Arguments
///
/// * `report` - The finished run report
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Tablecrawl Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    if let Some(run_id) = report.run_id {
        md.push_str(&format!("- **Run ID**: {}\n", run_id));
    }
    md.push_str(&format!("- **Start URL**: {}\n", report.start_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    md.push('\n');

    md.push_str("## Totals\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Targets dispatched | {} |\n", report.targets_dispatched));
    md.push_str(&format!("| Targets completed | {} |\n", report.targets_completed));
    md.push_str(&format!("| Targets failed | {} |\n", report.failed.len()));
    md.push_str(&format!(
        "| Skipped by robots.txt | {} |\n",
        report.skipped_by_robots.len()
    ));
    md.push_str(&format!("| Rows found | {} |\n", report.rows_found));
    md.push_str(&format!("| Chunks built | {} |\n", report.chunks_built));
    md.push_str(&format!("| Artifacts written | {} |\n", report.artifacts_written));
    md.push_str(&format!("| Records emitted | {} |\n\n", report.records_emitted));
    md.push_str(&format!("Success rate: {:.2}%\n\n", report.success_rate()));

    if report.page_cap_reached {
        md.push_str(&format!(
            "Page cap reached; {} Target(s) were left in the frontier.\n\n",
            report.frontier_remaining
        ));
    }

    if !report.failed.is_empty() {
        md.push_str("## Failed Targets\n\n");
        md.push_str("| URL | Stage | Attempts | Error |\n");
        md.push_str("|-----|-------|----------|-------|\n");

        for failure in report.failed.iter().take(MAX_FAILURES_LISTED) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                failure.url,
                failure.stage,
                failure.attempts,
                failure.message.replace('|', "\\|")
            ));
        }
        if report.failed.len() > MAX_FAILURES_LISTED {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.failed.len() - MAX_FAILURES_LISTED
            ));
        }
        md.push('\n');
    }

    if !report.skipped_by_robots.is_empty() {
        md.push_str("## Skipped by robots.txt\n\n");
        for url in &report.skipped_by_robots {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    md
}
