//! Commons Sync - Startup Reconciler and Service Layer
//!
//! Ties the component crates together:
//!
//! - [`StartupReconciler`]: merges fresh reference data with the persisted
//!   session, then validates and repairs the result.
//! - [`CachedRemote`]: read-through caching over the remote backend.
//! - [`TrustService`]: applies trust actions with audit, persistence, and
//!   cache invalidation.
//! - [`CommonsEngine`]: constructs all of the above from one
//!   [`EngineConfig`](commons_core::EngineConfig).

mod engine;
pub mod projection;
mod reconcile;
mod remote;
mod trust_service;

pub use engine::CommonsEngine;
pub use reconcile::{Initialized, StartupReconciler};
pub use remote::CachedRemote;
pub use trust_service::TrustService;
