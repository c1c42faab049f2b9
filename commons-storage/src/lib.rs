//! Commons Storage - Expiring Cache and Durable Store Adapter
//!
//! Two process-local stores with very different lifetimes:
//!
//! - [`cache`]: in-memory key/value entries with per-entry TTL, used by the
//!   remote-read paths to avoid redundant fetches.
//! - [`durable`]: whole-aggregate persistence over a synchronous, string-only
//!   key-value medium that survives across sessions.
//!
//! Both are explicitly constructed handles. Nothing here is a global; callers
//! pass the instance they want to use.

pub mod cache;
pub mod durable;

pub use cache::{CacheStats, CacheTier, ExpiringCache};
pub use durable::{
    Aggregate, AggregateKey, AggregateKind, DisabledMedium, DurableStore, FileMedium,
    KeyValueMedium, MemoryMedium, SessionStore,
};
