//! Consistency Validator & Repairer
//!
//! Detects invariant violations in an [`AppState`](commons_core::AppState)
//! and repairs them in place. Violations are data, not errors: each one is a
//! [`ConsistencyIssue`] variant and [`apply_repair`] is the single dispatcher
//! that fixes it.
//!
//! Invariants checked:
//!
//! 1. The active user's trust score lies in [0, 100].
//! 2. Every thread id on the active user names an existing thread.
//! 3. Every RSVP'd user on an event is the active user or an available user.
//! 4. Every thread participant is a known user.
//! 5. Every event venue reference names a known venue.
//!
//! Each repair only removes ids or narrows a number, so repairs never create
//! new violations and a second validation pass reports nothing.

mod issue;
mod repair;
mod validator;

pub use issue::ConsistencyIssue;
pub use repair::{apply_fixes, apply_repair, validate_and_repair, RepairOutcome};
pub use validator::{validate, ValidationReport};
