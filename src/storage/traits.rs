//! Storage traits and error types
//!
//! The crawl core persists through two narrow interfaces: a key/value store
//! for HTML artifacts (overwrite semantics) and an append-only record sink.

use crate::crawler::TargetFailure;
use crate::storage::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Named blobs with overwrite semantics
///
/// Writing an existing key replaces its value, so reprocessing a Target
/// leaves the same final artifacts behind.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set_value(&self, key: &str, value: &str, content_type: &str) -> StoreResult<()>;
}

/// Append-only sink for structured records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Appends one record
    async fn push_record(&self, record: &Record) -> StoreResult<()>;

    /// Keeps a failed Target for later inspection
    ///
    /// Sinks without a place for failures ignore them.
    async fn record_failure(&self, _failure: &TargetFailure) -> StoreResult<()> {
        Ok(())
    }
}

/// Returns true if `key` is safe to use as a single file name
///
/// Keys are flat: ASCII letters, digits, `.`, `_` and `-`, not starting
/// with a dot.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
