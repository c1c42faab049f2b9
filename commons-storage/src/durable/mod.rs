//! Durable store adapter.
//!
//! Persists whole domain aggregates into a synchronous, string-only key-value
//! medium (the browser-style `getItem`/`setItem`/`removeItem` contract).
//!
//! # Layers
//!
//! - [`KeyValueMedium`]: the raw medium. [`MemoryMedium`], [`FileMedium`],
//!   and [`DisabledMedium`] are provided.
//! - [`DurableStore`]: probes availability, wraps values in a versioned
//!   envelope, checks ownership and shape on load, and degrades every failure
//!   to a logged no-op or an absent value.
//! - [`SessionStore`]: typed save/load for each aggregate the client keeps.
//!
//! # Key layout
//!
//! ```text
//! {namespace}:user                    session profile slot
//! {namespace}:{kind}:{user_id}        per-user aggregates
//! ```

pub mod file_medium;
pub mod key;
pub mod medium;
pub mod record;
pub mod session;
pub mod store;

pub use file_medium::FileMedium;
pub use key::{AggregateKey, AggregateKind};
pub use medium::{DisabledMedium, KeyValueMedium, MemoryMedium};
pub use record::Aggregate;
pub use session::SessionStore;
pub use store::DurableStore;
