//! Cache entry owned exclusively by [`super::ExpiringCache`].

use commons_core::Timestamp;
use std::any::Any;
use std::sync::Arc;

/// Type-erased cached value with its expiry instant.
pub(crate) struct CacheEntry {
    data: Arc<dyn Any + Send + Sync>,
    expires_at: Timestamp,
    /// Monotonic access tick for least-recently-accessed eviction.
    last_access: u64,
}

impl CacheEntry {
    pub(crate) fn new<T: Send + Sync + 'static>(value: T, expires_at: Timestamp, tick: u64) -> Self {
        Self {
            data: Arc::new(value),
            expires_at,
            last_access: tick,
        }
    }

    /// Logically absent once `now` is strictly past the expiry instant.
    pub(crate) fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    pub(crate) fn downcast<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    pub(crate) fn touch(&mut self, tick: u64) {
        self.last_access = tick;
    }

    pub(crate) fn last_access(&self) -> u64 {
        self.last_access
    }

    pub(crate) fn expires_at(&self) -> Timestamp {
        self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_expiry_is_strict() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new(1u8, at, 0);
        assert!(!entry.is_expired(at));
        assert!(entry.is_expired(at + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_downcast_wrong_type_is_none() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new("text".to_string(), at, 0);
        assert_eq!(entry.downcast::<String>().map(String::as_str), Some("text"));
        assert!(entry.downcast::<u32>().is_none());
    }
}
