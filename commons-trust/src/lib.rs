//! Trust-Points Ledger
//!
//! Integer reputation arithmetic for the commons client:
//!
//! - [`TrustAction`]: the fixed action table and its wire keys
//! - [`delta`] / [`apply_action`]: pure, clamped score arithmetic
//! - [`TrustLedger`]: history recording and audit summaries
//!
//! Persisting the score and the history is the caller's job; nothing here
//! performs I/O.

mod action;
mod ledger;

pub use action::{apply_action, delta, is_below_warning, meets_threshold, TrustAction};
pub use ledger::{TrustLedger, TrustSummary};
