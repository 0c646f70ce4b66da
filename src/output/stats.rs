//! Statistics from the record database
//!
//! Backs the `--stats` mode: loads aggregate counts for the latest run and
//! prints them.

use crate::storage::{load_run_statistics, open_database, RunStatistics};
use crate::TablecrawlError;
use std::path::Path;

/// Loads statistics for the latest run in the database at `path`
///
/// # Arguments
///
/// * `path` - Path to the SQLite record database
pub fn load_statistics(path: &Path) -> Result<RunStatistics, TablecrawlError> {
    let conn = open_database(path)?;
    Ok(load_run_statistics(&conn)?)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Runs recorded: {}", stats.total_runs);

    let Some(run) = &stats.latest_run else {
        println!("No runs found.");
        return;
    };

    println!();
    println!("Latest run #{}:", run.id);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", run.config_hash);
    println!();

    println!("Records:");
    println!("  Rows: {}", stats.row_records);
    println!("  Chunks: {}", stats.chunk_records);
    println!("  Pages with records: {}", stats.distinct_urls);
    println!();

    let processed = run.targets_completed + run.targets_failed;
    let success_rate = if processed > 0 {
        (run.targets_completed as f64 / processed as f64) * 100.0
    } else {
        0.0
    };

    println!("Targets:");
    println!("  Completed: {}", run.targets_completed);
    println!("  Failed: {}", stats.failed_targets);
    println!(
        "Success Rate: {:.1}% ({} / {} Targets completed)",
        success_rate, run.targets_completed, processed
    );
}
