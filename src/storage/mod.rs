//! Storage module for crawl output
//!
//! This module handles everything a crawl persists:
//! - HTML artifacts (raw pages and chunk documents) in a key/value store
//! - Row and chunk records in an append-only record sink
//! - Run bookkeeping and failed Targets in SQLite
//! - Deterministic artifact keys derived from canonical URLs

mod fs;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use fs::FsKeyValueStore;
pub use memory::{MemoryKeyValueStore, MemoryRecordSink};
pub use sqlite::{load_run_statistics, open_database, RunStatistics, SqliteRecordSink};
pub use traits::{is_valid_key, KeyValueStore, RecordSink, StoreError, StoreResult};

use crate::crawler::Row;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Content type of every artifact the crawler writes
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// A structured record emitted for downstream consumption
///
/// Row positions are 0-based within their Target, chunk indices 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Row {
        target_id: u64,
        url: String,
        position: usize,
        cells: Row,
    },
    Chunk {
        target_id: u64,
        url: String,
        chunk_index: usize,
        row_count: usize,
        rows: Vec<Row>,
    },
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Row { .. } => "row",
            Self::Chunk { .. } => "chunk",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Row { url, .. } | Self::Chunk { url, .. } => url,
        }
    }

    pub fn target_id(&self) -> u64 {
        match self {
            Self::Row { target_id, .. } | Self::Chunk { target_id, .. } => *target_id,
        }
    }

    /// Row position or chunk index, whichever applies
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Row { position, .. } => *position,
            Self::Chunk { chunk_index, .. } => *chunk_index,
        }
    }
}

/// A blob held by a key/value store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub key: String,
    pub content_type: String,
    pub body: String,
}

/// Deterministic artifact keys for one Target URL
///
/// # Example
///
/// ```
/// use tablecrawl::storage::ArtifactKeys;
/// use url::Url;
///
/// let keys = ArtifactKeys::for_url(&Url::parse("https://www.example.com/list?page=2").unwrap());
/// assert!(keys.raw_page().starts_with("raw_www-example-com-"));
/// assert!(keys.chunk(1).ends_with("_chunk_1.html"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    slug: String,
}

impl ArtifactKeys {
    pub fn for_url(url: &Url) -> Self {
        let host: String = url
            .host_str()
            .unwrap_or("page")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();

        let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
        Self {
            slug: format!("{}-{}", host, &digest[..16]),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Key of the raw page document
    pub fn raw_page(&self) -> String {
        format!("raw_{}.html", self.slug)
    }

    /// Key of the chunk document with 1-based `index`
    pub fn chunk(&self, index: usize) -> String {
        format!("{}_chunk_{}.html", self.slug, index)
    }
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A crawl run as stored in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub targets_completed: u64,
    pub targets_failed: u64,
    pub rows_found: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            assert_eq!(
                RunStatus::from_db_string(status.to_db_string()),
                Some(*status)
            );
        }
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_keys_are_deterministic() {
        let a = ArtifactKeys::for_url(&url("https://example.com/list?page=1"));
        let b = ArtifactKeys::for_url(&url("https://example.com/list?page=1"));
        assert_eq!(a, b);
        assert_eq!(a.raw_page(), b.raw_page());
    }

    #[test]
    fn test_keys_differ_per_url() {
        let a = ArtifactKeys::for_url(&url("https://example.com/list?page=1"));
        let b = ArtifactKeys::for_url(&url("https://example.com/list?page=2"));
        assert_ne!(a.slug(), b.slug());
    }

    #[test]
    fn test_key_shape() {
        let keys = ArtifactKeys::for_url(&url("https://portal.3gpp.org:8443/crs"));
        let slug = keys.slug();
        assert!(slug.starts_with("portal-3gpp-org-"));
        assert_eq!(slug.len(), "portal-3gpp-org-".len() + 16);
        assert_eq!(keys.raw_page(), format!("raw_{}.html", slug));
        assert_eq!(keys.chunk(2), format!("{}_chunk_2.html", slug));
        assert!(is_valid_key(&keys.raw_page()));
        assert!(is_valid_key(&keys.chunk(10)));
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = Record::Row {
            target_id: 1,
            url: "https://example.com/".to_string(),
            position: 0,
            cells: vec!["a".to_string()],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "row");
        assert_eq!(json["position"], 0);
        assert_eq!(record.kind(), "row");
        assert_eq!(record.ordinal(), 0);
    }
}
