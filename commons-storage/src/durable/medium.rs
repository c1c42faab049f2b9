//! Raw key-value media.

use commons_core::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Synchronous, string-only, per-origin key-value medium.
///
/// Availability is environment dependent; implementations report failures as
/// [`StorageError`] and leave degradation policy to [`super::DurableStore`].
pub trait KeyValueMedium: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Every key currently stored.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

impl<M: KeyValueMedium + ?Sized> KeyValueMedium for Arc<M> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

/// In-memory medium with an optional byte quota.
///
/// The quota counts key plus value bytes across all items, mirroring how
/// browser storage rejects writes once the origin's allowance is used up.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    items: RwLock<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Raw stored string, bypassing the store. For inspection and tests.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.read().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let bytes = key.len() + value.len();
            if used + bytes > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    bytes,
                });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
        items.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.keys().cloned().collect())
    }
}

/// A medium that is never available, e.g. storage disabled by the host or a
/// process running outside any browser-like context.
#[derive(Debug, Clone)]
pub struct DisabledMedium {
    reason: String,
}

impl DisabledMedium {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable(&self) -> StorageError {
        StorageError::Unavailable {
            reason: self.reason.clone(),
        }
    }
}

impl KeyValueMedium for DisabledMedium {
    fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(self.unavailable())
    }

    fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(self.unavailable())
    }

    fn remove_item(&self, _key: &str) -> StorageResult<()> {
        Err(self.unavailable())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Err(self.unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_medium_basic_ops() {
        let medium = MemoryMedium::new();
        assert_eq!(medium.get_item("a").unwrap(), None);
        medium.set_item("a", "1").unwrap();
        medium.set_item("b", "2").unwrap();
        assert_eq!(medium.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(medium.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        medium.remove_item("a").unwrap();
        medium.remove_item("a").unwrap();
        assert_eq!(medium.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let medium = MemoryMedium::with_quota(10);
        medium.set_item("k", "1234").unwrap();
        let err = medium.set_item("j", "123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(medium.get_item("j").unwrap(), None);
    }

    #[test]
    fn test_quota_allows_replacing_existing_key() {
        let medium = MemoryMedium::with_quota(10);
        medium.set_item("k", "123456789").unwrap();
        medium.set_item("k", "987654321").unwrap();
        assert_eq!(medium.raw("k").as_deref(), Some("987654321"));
    }

    #[test]
    fn test_disabled_medium_always_fails() {
        let medium = DisabledMedium::new("private browsing");
        assert!(matches!(
            medium.get_item("a"),
            Err(StorageError::Unavailable { .. })
        ));
        assert!(medium.set_item("a", "1").is_err());
        assert!(medium.keys().is_err());
    }

    #[test]
    fn test_shared_medium_sees_same_items() {
        let medium = Arc::new(MemoryMedium::new());
        let other = Arc::clone(&medium);
        medium.set_item("a", "1").unwrap();
        assert_eq!(other.get_item("a").unwrap().as_deref(), Some("1"));
    }
}
