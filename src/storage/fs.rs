//! Filesystem key/value store
//!
//! One file per key under a single directory. Values are written to a
//! temporary file first and renamed into place, so a reader never sees a
//! half-written artifact and overwrites are atomic.

use crate::storage::traits::{is_valid_key, KeyValueStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Key/value store backed by a directory
#[derive(Debug, Clone)]
pub struct FsKeyValueStore {
    dir: PathBuf,
}

impl FsKeyValueStore {
    /// Opens a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl KeyValueStore for FsKeyValueStore {
    async fn set_value(&self, key: &str, value: &str, content_type: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let temp = self.dir.join(format!(
            ".{}.tmp-{}-{}",
            key,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        tokio::fs::write(&temp, value.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::trace!("Stored {} ({}, {} bytes)", key, content_type, value.len());
        Ok(())
    }
}
