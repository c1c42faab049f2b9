//! The expiring cache handle.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use commons_core::{CacheSettings, SharedClock, SystemClock, TierSettings, Timestamp};

use super::entry::CacheEntry;
use super::pattern::glob_to_regex;
use super::stats::CacheStats;

/// TTL preset. List data that changes often uses the short tiers, reference
/// lookups of single entities use the long ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    Short,
    Medium,
    Long,
    VeryLong,
}

impl CacheTier {
    pub fn ttl(self, tiers: &TierSettings) -> Duration {
        let millis = match self {
            CacheTier::Short => tiers.short_ms,
            CacheTier::Medium => tiers.medium_ms,
            CacheTier::Long => tiers.long_ms,
            CacheTier::VeryLong => tiers.very_long_ms,
        };
        Duration::from_millis(millis)
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
    tick: u64,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove_expired(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.stats.expirations += removed as u64;
        removed
    }

    fn evict_least_recent(&mut self) -> Option<String> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access())
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&victim);
        self.stats.evictions += 1;
        Some(victim)
    }
}

/// In-memory key/value cache with per-entry time-to-live.
///
/// Writes are last-write-wins. Reads never block on I/O and never fail: an
/// expired, missing, or differently typed entry reads as `None`.
///
/// All operations take `&self`; the map sits behind a mutex so the handle can
/// be shared across tasks. A poisoned lock is recovered rather than surfaced.
pub struct ExpiringCache {
    inner: Mutex<CacheInner>,
    clock: SharedClock,
    default_ttl: Duration,
    tiers: TierSettings,
    max_entries: Option<usize>,
}

impl ExpiringCache {
    /// Create a cache from settings, reading time from `clock`.
    pub fn new(settings: &CacheSettings, clock: SharedClock) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            clock,
            default_ttl: settings.default_ttl(),
            tiers: settings.tiers.clone(),
            max_entries: settings.max_entries,
        }
    }

    /// Default settings on the wall clock.
    pub fn with_defaults() -> Self {
        Self::new(&CacheSettings::default(), SystemClock::shared())
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn tier_ttl(&self, tier: CacheTier) -> Duration {
        tier.ttl(&self.tiers)
    }

    /// Return the cached value if present, unexpired, and of type `T`.
    ///
    /// An expired entry is physically evicted here.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = self.clock.now();
        let mut inner = self.lock();
        let tick = inner.next_tick();

        let expired = match inner.entries.get(key) {
            None => {
                inner.stats.misses += 1;
                tracing::trace!(target: "commons::cache", key, "cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            tracing::trace!(target: "commons::cache", key, "cache entry expired");
            return None;
        }

        let value = inner.entries.get_mut(key).and_then(|entry| {
            entry.touch(tick);
            entry.downcast::<T>().cloned()
        });
        match value {
            Some(value) => {
                inner.stats.hits += 1;
                tracing::trace!(target: "commons::cache", key, "cache hit");
                Some(value)
            }
            None => {
                inner.stats.misses += 1;
                tracing::debug!(
                    target: "commons::cache",
                    key,
                    "cached value has a different type, treating as absent"
                );
                None
            }
        }
    }

    /// Store `value` under `key`, expiring after `ttl` (or the default TTL).
    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Option<Duration>)
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let now = self.clock.now();
        let expires_at = expiry_after(now, ttl.unwrap_or(self.default_ttl));
        let mut inner = self.lock();

        if let Some(max) = self.max_entries {
            if !inner.entries.contains_key(&key) && inner.entries.len() >= max {
                inner.remove_expired(now);
                while inner.entries.len() >= max {
                    match inner.evict_least_recent() {
                        Some(victim) => {
                            tracing::debug!(target: "commons::cache", key = %victim, "evicted at capacity");
                        }
                        None => break,
                    }
                }
            }
        }

        let tick = inner.next_tick();
        inner.entries.insert(key, CacheEntry::new(value, expires_at, tick));
    }

    /// Store `value` with the TTL of a preset tier.
    pub fn set_tiered<T>(&self, key: impl Into<String>, value: T, tier: CacheTier)
    where
        T: Send + Sync + 'static,
    {
        self.set(key, value, Some(self.tier_ttl(tier)));
    }

    /// Remove exactly one key. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Remove every key fully matching `glob`. Returns the number removed.
    pub fn invalidate_pattern(&self, glob: &str) -> usize {
        let regex = match glob_to_regex(glob) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!(target: "commons::cache", glob, error = %e, "invalid invalidation pattern");
                return 0;
            }
        };
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !regex.is_match(key));
        let removed = before - inner.entries.len();
        tracing::debug!(target: "commons::cache", glob, removed, "pattern invalidation");
        removed
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Physically drop every expired entry. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock().remove_expired(now)
    }

    /// When `key` expires, if it is physically present.
    pub fn expires_at(&self, key: &str) -> Option<Timestamp> {
        self.lock().entries.get(key).map(CacheEntry::expires_at)
    }

    /// Physically present entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entry_count: inner.entries.len() as u64,
            ..inner.stats.clone()
        }
    }
}

fn expiry_after(now: Timestamp, ttl: Duration) -> Timestamp {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use commons_core::ManualClock;
    use std::sync::Arc;

    fn cache_with_clock(settings: CacheSettings) -> (ExpiringCache, ManualClock) {
        let clock = ManualClock::starting_now();
        let cache = ExpiringCache::new(&settings, Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_get_after_set_returns_value() {
        let (cache, _clock) = cache_with_clock(CacheSettings::default());
        cache.set("ngos:all", vec!["a".to_string()], Some(Duration::from_millis(1000)));
        assert_eq!(cache.get::<Vec<String>>("ngos:all"), Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache_with_clock(CacheSettings::default());
        cache.set("ngos:all", 1u32, Some(Duration::from_millis(1000)));

        clock.advance_ms(1000);
        assert_eq!(cache.get::<u32>("ngos:all"), Some(1));

        clock.advance_ms(1);
        assert_eq!(cache.get::<u32>("ngos:all"), None);
        assert_eq!(cache.len(), 0, "expired entry is evicted on read");
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_default_ttl_applies() {
        let settings = CacheSettings {
            default_ttl_ms: 500,
            ..CacheSettings::default()
        };
        let (cache, clock) = cache_with_clock(settings);
        cache.set("k", 7i64, None);
        clock.advance_ms(501);
        assert_eq!(cache.get::<i64>("k"), None);
    }

    #[test]
    fn test_set_overwrites_unconditionally() {
        let (cache, clock) = cache_with_clock(CacheSettings::default());
        cache.set("k", 1u8, Some(Duration::from_millis(10)));
        cache.set("k", 2u8, Some(Duration::from_millis(1000)));
        clock.advance_ms(20);
        assert_eq!(cache.get::<u8>("k"), Some(2));
    }

    #[test]
    fn test_wrong_type_reads_as_absent() {
        let (cache, _clock) = cache_with_clock(CacheSettings::default());
        cache.set("k", "text".to_string(), None);
        assert_eq!(cache.get::<u64>("k"), None);
        assert_eq!(cache.get::<String>("k").as_deref(), Some("text"));
    }

    #[test]
    fn test_invalidate_single_key() {
        let (cache, _clock) = cache_with_clock(CacheSettings::default());
        cache.set("a", 1u8, None);
        cache.set("b", 2u8, None);
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.get::<u8>("a"), None);
        assert_eq!(cache.get::<u8>("b"), Some(2));
    }

    #[test]
    fn test_invalidate_pattern_leaves_other_prefixes() {
        let (cache, _clock) = cache_with_clock(CacheSettings::default());
        cache.set("events:all", 0u8, None);
        cache.set("ngos:all", 1u8, None);
        cache.set("ngos:search:a", 2u8, None);

        assert_eq!(cache.invalidate_pattern("ngos:*"), 2);
        assert_eq!(cache.get::<u8>("ngos:all"), None);
        assert_eq!(cache.get::<u8>("ngos:search:a"), None);
        assert_eq!(cache.get::<u8>("events:all"), Some(0));
    }

    #[test]
    fn test_invalidate_pattern_does_not_match_partially() {
        let (cache, _clock) = cache_with_clock(CacheSettings::default());
        cache.set("my-ngos:all", 1u8, None);
        assert_eq!(cache.invalidate_pattern("ngos:*"), 0);
        assert_eq!(cache.get::<u8>("my-ngos:all"), Some(1));
    }

    #[test]
    fn test_clear_removes_everything() {
        let (cache, _clock) = cache_with_clock(CacheSettings::default());
        cache.set("a", 1u8, None);
        cache.set("b", 2u8, None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_expired_reclaims_unread_entries() {
        let (cache, clock) = cache_with_clock(CacheSettings::default());
        cache.set("short", 1u8, Some(Duration::from_millis(10)));
        cache.set("long", 2u8, Some(Duration::from_secs(60)));
        clock.advance_ms(11);
        assert_eq!(cache.len(), 2, "no background sweep");
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_bounded_cache_evicts_least_recently_accessed() {
        let settings = CacheSettings {
            max_entries: Some(2),
            ..CacheSettings::default()
        };
        let (cache, _clock) = cache_with_clock(settings);
        cache.set("a", 1u8, None);
        cache.set("b", 2u8, None);
        assert_eq!(cache.get::<u8>("a"), Some(1));

        cache.set("c", 3u8, None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get::<u8>("b"), None);
        assert_eq!(cache.get::<u8>("a"), Some(1));
        assert_eq!(cache.get::<u8>("c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_bounded_cache_prefers_dropping_expired() {
        let settings = CacheSettings {
            max_entries: Some(2),
            ..CacheSettings::default()
        };
        let (cache, clock) = cache_with_clock(settings);
        cache.set("old", 1u8, Some(Duration::from_millis(5)));
        cache.set("fresh", 2u8, Some(Duration::from_secs(60)));
        clock.advance_ms(10);
        cache.set("new", 3u8, None);
        assert_eq!(cache.get::<u8>("fresh"), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let settings = CacheSettings {
            max_entries: Some(1),
            ..CacheSettings::default()
        };
        let (cache, _clock) = cache_with_clock(settings);
        cache.set("a", 1u8, None);
        cache.set("a", 2u8, None);
        assert_eq!(cache.get::<u8>("a"), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_tier_ttls_follow_settings() {
        let (cache, clock) = cache_with_clock(CacheSettings::default());
        cache.set_tiered("list", 1u8, CacheTier::Short);
        cache.set_tiered("entity", 2u8, CacheTier::Long);
        clock.advance(cache.tier_ttl(CacheTier::Short) + Duration::from_millis(1));
        assert_eq!(cache.get::<u8>("list"), None);
        assert_eq!(cache.get::<u8>("entity"), Some(2));
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let (cache, _clock) = cache_with_clock(CacheSettings::default());
        cache.set("a", 1u8, None);
        let _ = cache.get::<u8>("a");
        let _ = cache.get::<u8>("missing");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
