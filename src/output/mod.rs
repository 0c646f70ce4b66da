//! Output module for run reports
//!
//! This module handles:
//! - The end-of-run [`CrawlReport`]
//! - Printing reports and database statistics to stdout
//! - Markdown summaries

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{CrawlReport, OutputError, OutputResult};
pub use stats::{load_statistics, print_statistics};

/// Prints a run report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("\n=== Crawl Complete ===");
    if let Some(run_id) = report.run_id {
        println!("Run ID: {}", run_id);
    }
    println!("Start URL: {}", report.start_url);
    if let Some(duration) = report.duration_seconds() {
        println!("Duration: {}s", duration);
    }
    println!();

    println!("Targets dispatched: {}", report.targets_dispatched);
    println!("Targets completed: {}", report.targets_completed);
    println!("Targets failed: {}", report.failed.len());
    if !report.skipped_by_robots.is_empty() {
        println!("Skipped by robots.txt: {}", report.skipped_by_robots.len());
    }
    println!("Rows found: {}", report.rows_found);
    println!("Chunks built: {}", report.chunks_built);
    println!("Artifacts written: {}", report.artifacts_written);
    println!("Records emitted: {}", report.records_emitted);

    if report.page_cap_reached {
        println!(
            "Page cap reached with {} Target(s) left in the frontier",
            report.frontier_remaining
        );
    }

    if !report.failed.is_empty() {
        println!("\nFailed Targets:");
        for failure in &report.failed {
            println!(
                "  - {} ({} after {} attempt(s)): {}",
                failure.url, failure.stage, failure.attempts, failure.message
            );
        }
    }
}
