//! The durable store adapter.

use std::sync::atomic::{AtomicBool, Ordering};

use commons_core::{
    SharedClock, StorageError, StorageResult, StorageSettings, SystemClock, UserId,
};
use serde_json::Value;

use super::key::{AggregateKey, AggregateKind};
use super::medium::KeyValueMedium;
use super::record::{Aggregate, PersistedRecord};

const PROBE_KEY: &str = "__probe__";
const PROBE_VALUE: &str = "commons-probe";

/// Aggregate persistence over a [`KeyValueMedium`].
///
/// Writes never fail from the caller's point of view: an unavailable medium
/// or exhausted quota becomes a logged warning. Reads return `None` for
/// anything missing, corrupt, stale in version, or owned by another user.
/// The `try_*` variants expose the underlying [`StorageError`] for
/// diagnostics and tests.
pub struct DurableStore<M: KeyValueMedium> {
    medium: M,
    namespace: String,
    schema_version: u32,
    clock: SharedClock,
    available: AtomicBool,
}

impl<M: KeyValueMedium> DurableStore<M> {
    /// Wrap `medium`, probing it once with a sentinel write/read/delete.
    pub fn new(medium: M, settings: &StorageSettings, clock: SharedClock) -> Self {
        let store = Self {
            medium,
            namespace: settings.namespace.clone(),
            schema_version: settings.schema_version,
            clock,
            available: AtomicBool::new(false),
        };
        let available = match store.probe() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    target: "commons::store",
                    error = %e,
                    "persistent storage unavailable, continuing in memory only"
                );
                false
            }
        };
        store.available.store(available, Ordering::Relaxed);
        store
    }

    /// Default settings on the wall clock.
    pub fn with_defaults(medium: M) -> Self {
        Self::new(medium, &StorageSettings::default(), SystemClock::shared())
    }

    fn probe(&self) -> StorageResult<()> {
        let key = format!("{}:{}", self.namespace, PROBE_KEY);
        self.medium.set_item(&key, PROBE_VALUE)?;
        let read_back = self.medium.get_item(&key)?;
        self.medium.remove_item(&key)?;
        if read_back.as_deref() == Some(PROBE_VALUE) {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                reason: "probe value did not read back".to_string(),
            })
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Session profile key.
    pub fn session_key(&self, expected_owner: Option<&UserId>) -> AggregateKey {
        AggregateKey::session(self.namespace.clone(), expected_owner.cloned())
    }

    /// Per-user aggregate key.
    pub fn owned_key(&self, kind: AggregateKind, owner: &UserId) -> AggregateKey {
        AggregateKey::owned(self.namespace.clone(), kind, owner.clone())
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                reason: "storage probe failed for this session".to_string(),
            })
        }
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Persist `value` under `key`. Failures are logged, never returned.
    pub fn save<T: Aggregate>(&self, key: &AggregateKey, value: &T) {
        if let Err(e) = self.try_save(key, value) {
            if matches!(e, StorageError::Unavailable { .. }) {
                self.available.store(false, Ordering::Relaxed);
            }
            tracing::warn!(
                target: "commons::store",
                key = %key,
                error = %e,
                "skipping persistence"
            );
        }
    }

    /// Persist `value`, reporting why a write did not happen.
    pub fn try_save<T: Aggregate>(&self, key: &AggregateKey, value: &T) -> StorageResult<()> {
        self.ensure_available()?;
        let encoded = key.encode();
        if key.kind() != T::KIND {
            return Err(StorageError::KindMismatch {
                key: encoded,
                found: T::KIND.to_string(),
                expected: key.kind().to_string(),
            });
        }
        if let (Some(expected), Some(actual)) = (key.owner(), value.owner()) {
            if expected != actual {
                return Err(StorageError::OwnerMismatch { key: encoded });
            }
        }

        let record = PersistedRecord {
            version: self.schema_version,
            kind: T::KIND.as_str().to_string(),
            owner: key.owner().or_else(|| value.owner()).cloned(),
            saved_at: Some(self.clock.now()),
            data: value,
        };
        let serialized =
            serde_json::to_string(&record).map_err(|e| StorageError::Serialization {
                key: encoded.clone(),
                reason: e.to_string(),
            })?;
        self.medium.set_item(&encoded, &serialized)?;
        tracing::debug!(target: "commons::store", key = %encoded, bytes = serialized.len(), "aggregate saved");
        Ok(())
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Load the aggregate under `key`, or `None` if it is missing or invalid.
    pub fn load<T: Aggregate>(&self, key: &AggregateKey) -> Option<T> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    target: "commons::store",
                    key = %key,
                    error = %e,
                    "discarding unusable persisted record"
                );
                None
            }
        }
    }

    /// Load distinguishing "not stored" (`Ok(None)`) from "stored but unusable".
    pub fn try_load<T: Aggregate>(&self, key: &AggregateKey) -> StorageResult<Option<T>> {
        self.ensure_available()?;
        let encoded = key.encode();
        let Some(raw) = self.medium.get_item(&encoded)? else {
            return Ok(None);
        };

        let record: PersistedRecord<Value> =
            serde_json::from_str(&raw).map_err(|e| StorageError::Malformed {
                key: encoded.clone(),
                reason: e.to_string(),
            })?;

        if record.version != self.schema_version {
            return Err(StorageError::VersionMismatch {
                key: encoded,
                found: record.version,
                expected: self.schema_version,
            });
        }
        if record.kind != T::KIND.as_str() {
            return Err(StorageError::KindMismatch {
                key: encoded,
                found: record.kind,
                expected: T::KIND.as_str().to_string(),
            });
        }
        if let Some(expected) = key.owner() {
            if record.owner.as_ref() != Some(expected) {
                return Err(StorageError::OwnerMismatch { key: encoded });
            }
        }

        let value: T = serde_json::from_value(record.data).map_err(|e| StorageError::Malformed {
            key: encoded.clone(),
            reason: e.to_string(),
        })?;

        if let (Some(expected), Some(actual)) = (key.owner(), value.owner()) {
            if expected != actual {
                return Err(StorageError::OwnerMismatch { key: encoded });
            }
        }
        value
            .validate_shape()
            .map_err(|e| StorageError::ShapeMismatch {
                key: encoded,
                reason: e.to_string(),
            })?;
        Ok(Some(value))
    }

    // ========================================================================
    // REMOVAL
    // ========================================================================

    /// Remove one aggregate. Failures are logged.
    pub fn clear(&self, key: &AggregateKey) {
        let result = self
            .ensure_available()
            .and_then(|()| self.medium.remove_item(&key.encode()));
        if let Err(e) = result {
            tracing::warn!(target: "commons::store", key = %key, error = %e, "failed to clear aggregate");
        }
    }

    /// Remove every key in this namespace starting with `prefix`
    /// (`""` clears the whole namespace). Returns the number removed.
    pub fn clear_all(&self, prefix: &str) -> usize {
        match self.try_clear_all(prefix) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(target: "commons::store", prefix, error = %e, "failed to clear namespace");
                0
            }
        }
    }

    fn try_clear_all(&self, prefix: &str) -> StorageResult<usize> {
        self.ensure_available()?;
        let full_prefix = format!("{}:{}", self.namespace, prefix);
        let mut removed = 0;
        for key in self.medium.keys()? {
            if key.starts_with(&full_prefix) {
                self.medium.remove_item(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
