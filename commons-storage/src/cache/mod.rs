//! Expiring in-memory cache.
//!
//! Entries carry an absolute expiry instant. Expiry is detected lazily: an
//! expired entry is evicted the next time it is read, on an explicit
//! [`ExpiringCache::sweep_expired`], or by pattern invalidation.
//!
//! # Known bound
//!
//! With no `max_entries` configured there is no background sweep, so entries
//! that are written but never read again and never invalidated stay in memory
//! until the process exits. That is acceptable for a short-lived single-user
//! client. Long-lived hosts should set `max_entries` (least-recently-accessed
//! eviction) or call `sweep_expired` periodically.
//!
//! # Example
//!
//! ```ignore
//! let cache = ExpiringCache::new(&settings.cache, clock);
//! cache.set_tiered("ngos:all", ngos, CacheTier::Medium);
//! if let Some(ngos) = cache.get::<Vec<Ngo>>("ngos:all") { /* hit */ }
//! cache.invalidate_pattern("ngos:*");
//! ```

mod entry;
pub mod expiring;
pub mod pattern;
pub mod stats;

pub use expiring::{CacheTier, ExpiringCache};
pub use pattern::glob_to_regex;
pub use stats::CacheStats;
