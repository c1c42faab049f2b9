//! Repair dispatch.

use commons_core::AppState;
use serde::{Deserialize, Serialize};

use crate::validator::validate;
use crate::ConsistencyIssue;

/// Apply the repair for one issue. Returns whether `state` changed.
///
/// Container repairs touch every event or thread sharing the issue's id.
/// Repairs are idempotent: applying the same issue twice changes nothing the
/// second time.
pub fn apply_repair(issue: &ConsistencyIssue, state: &mut AppState) -> bool {
    match issue {
        ConsistencyIssue::ScoreOutOfBounds {
            user_id, clamped, ..
        } => match state.user.as_mut() {
            Some(user) if &user.id == user_id && user.trust_points != *clamped => {
                user.trust_points = *clamped;
                true
            }
            _ => false,
        },
        ConsistencyIssue::DanglingThreadReference { user_id, thread_id } => {
            match state.user.as_mut() {
                Some(user) if &user.id == user_id => retain_changed(&mut user.thread_ids, |id| id != thread_id),
                _ => false,
            }
        }
        ConsistencyIssue::UnknownRsvpUser { event_id, user_id } => state
            .events_with_id_mut(event_id)
            .fold(false, |changed, event| {
                retain_changed(&mut event.rsvp_list, |id| id != user_id) || changed
            }),
        ConsistencyIssue::UnknownParticipant { thread_id, user_id } => state
            .threads_with_id_mut(thread_id)
            .fold(false, |changed, thread| {
                retain_changed(&mut thread.participants, |id| id != user_id) || changed
            }),
        ConsistencyIssue::DanglingVenueReference { event_id, venue_id } => state
            .events_with_id_mut(event_id)
            .fold(false, |changed, event| {
                if event.venue_id.as_ref() == Some(venue_id) {
                    event.venue_id = None;
                    true
                } else {
                    changed
                }
            }),
    }
}

fn retain_changed<T>(items: &mut Vec<T>, keep: impl FnMut(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(keep);
    items.len() != before
}

/// Apply each repair in discovery order. Returns how many changed the state.
pub fn apply_fixes(state: &mut AppState, issues: &[ConsistencyIssue]) -> usize {
    if issues.is_empty() {
        return 0;
    }
    tracing::warn!(
        target: "commons::integrity",
        count = issues.len(),
        "consistency issues found, repairing"
    );
    for issue in issues {
        tracing::warn!(target: "commons::integrity", kind = issue.kind(), "{issue}");
    }

    let mut applied = 0;
    for issue in issues {
        if apply_repair(issue, state) {
            applied += 1;
            tracing::info!(target: "commons::integrity", kind = issue.kind(), "repaired: {issue}");
        } else {
            tracing::debug!(target: "commons::integrity", kind = issue.kind(), "repair was a no-op: {issue}");
        }
    }
    applied
}

/// What one validate, repair, re-validate cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub found: Vec<ConsistencyIssue>,
    pub applied: usize,
    /// Issues still present after repair. Empty unless a repair is missing.
    pub remaining: Vec<ConsistencyIssue>,
}

impl RepairOutcome {
    pub fn is_clean(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Validate, repair everything found in one pass, then validate once more.
pub fn validate_and_repair(state: &mut AppState) -> RepairOutcome {
    let found = validate(state).issues;
    let applied = apply_fixes(state, &found);
    let remaining = if found.is_empty() {
        Vec::new()
    } else {
        validate(state).issues
    };
    if !remaining.is_empty() {
        tracing::warn!(
            target: "commons::integrity",
            remaining = remaining.len(),
            "issues remain after a repair pass"
        );
    }
    RepairOutcome {
        found,
        applied,
        remaining,
    }
}
