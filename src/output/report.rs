//! Run report types
//!
//! This module defines the end-of-run report and the errors that can occur
//! while writing it out.

use crate::crawler::{PageSummary, TargetFailure};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// What a crawl run did
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    // Run metadata
    pub run_id: Option<i64>,
    pub start_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    // Targets
    pub targets_dispatched: u32,
    pub targets_completed: u32,
    pub failed: Vec<TargetFailure>,
    pub skipped_by_robots: Vec<String>,

    // Output volume
    pub rows_found: u64,
    pub chunks_built: u64,
    pub artifacts_written: u64,
    pub records_emitted: u64,

    /// Targets left in the frontier when the page cap stopped dispatch
    pub frontier_remaining: usize,
    pub page_cap_reached: bool,
}

impl CrawlReport {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            run_id: None,
            start_url: start_url.into(),
            started_at: Utc::now(),
            finished_at: None,
            targets_dispatched: 0,
            targets_completed: 0,
            failed: Vec::new(),
            skipped_by_robots: Vec::new(),
            rows_found: 0,
            chunks_built: 0,
            artifacts_written: 0,
            records_emitted: 0,
            frontier_remaining: 0,
            page_cap_reached: false,
        }
    }

    /// Adds the output of a completed Target
    pub fn record_success(&mut self, summary: &PageSummary) {
        self.targets_completed += 1;
        self.rows_found += summary.rows as u64;
        self.chunks_built += summary.chunks as u64;
        self.artifacts_written += summary.artifacts_written as u64;
        self.records_emitted += summary.records_emitted as u64;
    }

    pub fn record_failure(&mut self, failure: TargetFailure) {
        self.failed.push(failure);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Targets that reached a terminal state
    pub fn targets_processed(&self) -> u32 {
        self.targets_completed + self.failed.len() as u32
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of processed Targets that completed, in percent
    pub fn success_rate(&self) -> f64 {
        let processed = self.targets_processed();
        if processed == 0 {
            return 0.0;
        }
        (self.targets_completed as f64 / processed as f64) * 100.0
    }
}
