//! In-memory store and sink
//!
//! Used for dry runs and tests. Both can be switched into a failing mode to
//! exercise store-failure handling.

use crate::crawler::TargetFailure;
use crate::storage::traits::{is_valid_key, KeyValueStore, RecordSink, StoreError, StoreResult};
use crate::storage::{Record, StoredArtifact};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Key/value store held in a sorted map
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, StoredArtifact>>,
    writes: Mutex<u64>,
    failing: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<StoredArtifact> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    /// Keys currently stored, sorted
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every stored artifact, sorted by key
    pub fn snapshot(&self) -> Vec<StoredArtifact> {
        self.entries
            .lock()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Total successful writes, overwrites included
    pub fn write_count(&self) -> u64 {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn set_value(&self, key: &str, value: &str, content_type: &str) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write of {} refused", key)));
        }
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let artifact = StoredArtifact {
            key: key.to_string(),
            content_type: content_type.to_string(),
            body: value.to_string(),
        };
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), artifact);
        *self.writes.lock().map_err(|_| StoreError::Poisoned)? += 1;
        Ok(())
    }
}

/// Record sink that keeps everything in arrival order
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    records: Mutex<Vec<Record>>,
    failures: Mutex<Vec<TargetFailure>>,
    failing: AtomicBool,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every push fails
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records emitted for one Target URL, in arrival order
    pub fn records_for(&self, url: &str) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|record| record.url() == url)
            .collect()
    }

    pub fn failures(&self) -> Vec<TargetFailure> {
        self.failures
            .lock()
            .map(|failures| failures.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordSink for MemoryRecordSink {
    async fn push_record(&self, record: &Record) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("record sink refused push".to_string()));
        }
        self.records
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(record.clone());
        Ok(())
    }

    async fn record_failure(&self, failure: &TargetFailure) -> StoreResult<()> {
        self.failures
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(failure.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TEXT_HTML;

    #[tokio::test]
    async fn test_store_overwrites() {
        let store = MemoryKeyValueStore::new();
        store.set_value("a.html", "1", TEXT_HTML).await.unwrap();
        store.set_value("a.html", "2", TEXT_HTML).await.unwrap();

        assert_eq!(store.keys(), vec!["a.html"]);
        assert_eq!(store.get("a.html").unwrap().body, "2");
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MemoryKeyValueStore::failing();
        assert!(store.set_value("a.html", "1", TEXT_HTML).await.is_err());
        assert!(store.keys().is_empty());

        store.set_failing(false);
        assert!(store.set_value("a.html", "1", TEXT_HTML).await.is_ok());
    }

    #[tokio::test]
    async fn test_sink_keeps_arrival_order() {
        let sink = MemoryRecordSink::new();
        for position in 0..3 {
            sink.push_record(&Record::Row {
                target_id: 1,
                url: "https://example.com/".to_string(),
                position,
                cells: vec![position.to_string()],
            })
            .await
            .unwrap();
        }

        let positions: Vec<usize> = sink.records().iter().map(Record::ordinal).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(sink.records_for("https://example.com/").len(), 3);
        assert!(sink.records_for("https://other.org/").is_empty());
    }
}
