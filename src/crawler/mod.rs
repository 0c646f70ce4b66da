//! Crawler module for table extraction and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - Table extraction and chunking
//! - Pagination resolution and link discovery
//! - The per-Target fetch state machine with retries
//! - Frontier scheduling and overall crawl coordination

mod chunker;
mod coordinator;
mod executor;
mod extractor;
mod pagination;
mod parser;
mod retry;
mod scheduler;

pub use chunker::{build_chunks, escape_html, render_chunk_html, Chunk, DEFAULT_CHUNK_SIZE};
pub use coordinator::{run_crawl, Coordinator};
pub use executor::{
    ExecutorSettings, FetchExecutor, PageSummary, TargetContext, TargetFailure, TargetOutcome,
};
pub use extractor::{extract_rows, normalize_text, Row, TableExtractor, DEFAULT_TABLE_SELECTOR};
pub use pagination::{PaginationResolver, PaginationStrategy, Resolution};
pub use parser::{discover_links, resolve_link};
pub use retry::RetryPolicy;
pub use scheduler::{Admission, ScheduledTarget, Scheduler, Target, TargetId};
