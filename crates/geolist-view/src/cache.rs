//! Session cache for enriched record sets and the last opened dataset.
//!
//! Entries are keyed by `(namespace, dataset)` so several deployments can
//! share one cache directory without seeing each other's data.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use geolist_core::Record;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub dataset: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            dataset: dataset.into(),
        }
    }

    fn digest(&self) -> String {
        hex_digest(&format!("{}\u{0}{}", self.namespace, self.dataset))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDataset {
    pub saved_at: DateTime<Utc>,
    pub records: Vec<Record>,
}

impl CachedDataset {
    #[must_use]
    pub fn now(records: Vec<Record>) -> Self {
        Self {
            saved_at: Utc::now(),
            records,
        }
    }
}

pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SessionError`] when the entry exists but cannot be read.
    fn load(&self, key: &CacheKey) -> Result<Option<CachedDataset>, SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError`] when the entry cannot be written.
    fn save(&self, key: &CacheKey, entry: &CachedDataset) -> Result<(), SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError`] when the stored name cannot be read.
    fn last_dataset(&self, namespace: &str) -> Result<Option<String>, SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError`] when the name cannot be written.
    fn set_last_dataset(&self, namespace: &str, dataset: &str) -> Result<(), SessionError>;
}

fn hex_digest(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// One JSON file per entry under a cache directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.digest()))
    }

    fn last_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("last-{}.txt", hex_digest(namespace)))
    }

    fn read_optional(path: &Path) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::CacheIo {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    fn write(&self, path: &Path, body: &str) -> Result<(), SessionError> {
        let io_err = |e| SessionError::CacheIo {
            path: path.display().to_string(),
            source: e,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        std::fs::write(path, body).map_err(io_err)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, key: &CacheKey) -> Result<Option<CachedDataset>, SessionError> {
        let path = self.entry_path(key);
        let Some(body) = Self::read_optional(&path)? else {
            return Ok(None);
        };
        let entry = serde_json::from_str(&body).map_err(|e| SessionError::CacheFormat {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Some(entry))
    }

    fn save(&self, key: &CacheKey, entry: &CachedDataset) -> Result<(), SessionError> {
        let path = self.entry_path(key);
        let body = serde_json::to_string(entry).map_err(|e| SessionError::CacheFormat {
            path: path.display().to_string(),
            source: e,
        })?;
        self.write(&path, &body)?;
        tracing::debug!(
            namespace = %key.namespace,
            dataset = %key.dataset,
            records = entry.records.len(),
            "cached dataset"
        );
        Ok(())
    }

    fn last_dataset(&self, namespace: &str) -> Result<Option<String>, SessionError> {
        Ok(Self::read_optional(&self.last_path(namespace))?
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty()))
    }

    fn set_last_dataset(&self, namespace: &str, dataset: &str) -> Result<(), SessionError> {
        self.write(&self.last_path(namespace), dataset)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<CacheKey, CachedDataset>>,
    last: Mutex<HashMap<String, String>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &CacheKey) -> Result<Option<CachedDataset>, SessionError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &CacheKey, entry: &CachedDataset) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.clone(), entry.clone());
        Ok(())
    }

    fn last_dataset(&self, namespace: &str) -> Result<Option<String>, SessionError> {
        let last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(last.get(namespace).cloned())
    }

    fn set_last_dataset(&self, namespace: &str, dataset: &str) -> Result<(), SessionError> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.insert(namespace.to_owned(), dataset.to_owned());
        Ok(())
    }
}
