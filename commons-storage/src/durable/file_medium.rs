//! File-backed medium for desktop and CLI hosts.
//!
//! All items live in one JSON document. Every write rewrites the document
//! through a temporary file and a rename, so a crash mid-write leaves the
//! previous document intact.

use commons_core::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::medium::KeyValueMedium;

/// Key-value medium persisted as a single JSON object on disk.
#[derive(Debug)]
pub struct FileMedium {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
}

impl FileMedium {
    /// Open (or lazily create) the document at `path`.
    ///
    /// An unreadable or corrupt document starts the medium empty; the bad file
    /// is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match read_document(&path) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    target: "commons::store",
                    path = %path.display(),
                    error = %e,
                    "discarding unreadable storage document"
                );
                BTreeMap::new()
            }
        };
        Self {
            path,
            items: RwLock::new(items),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
        let unavailable = |e: std::io::Error| StorageError::Unavailable {
            reason: format!("{}: {}", self.path.display(), e),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(unavailable)?;
        }
        let contents =
            serde_json::to_string_pretty(items).map_err(|e| StorageError::Serialization {
                key: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents).map_err(unavailable)?;
        std::fs::rename(&tmp, &self.path).map_err(unavailable)?;
        Ok(())
    }
}

fn read_document(path: &Path) -> StorageResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| StorageError::Unavailable {
        reason: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| StorageError::Malformed {
        key: path.display().to_string(),
        reason: e.to_string(),
    })
}

impl KeyValueMedium for FileMedium {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&items) {
            match previous {
                Some(previous) => items.insert(key.to_string(), previous),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
        if let Some(previous) = items.remove(key) {
            if let Err(e) = self.flush(&items) {
                items.insert(key.to_string(), previous);
                return Err(e);
            }
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.keys().cloned().collect())
    }
}
