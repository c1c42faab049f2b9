//! Read-only invariant checks.

use std::collections::HashSet;

use commons_core::{
    clamp_trust_points, AppState, ThreadId, UserId, VenueId, TRUST_POINTS_MAX, TRUST_POINTS_MIN,
};
use serde::{Deserialize, Serialize};

use crate::ConsistencyIssue;

/// Outcome of one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// In discovery order, which is also repair order.
    pub issues: Vec<ConsistencyIssue>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<ConsistencyIssue>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            issues,
        }
    }
}

/// Check every invariant over `state` without modifying it.
///
/// Each offending id is reported once per container id, even if it appears
/// several times or the container id itself is duplicated. Its repair
/// removes every occurrence.
pub fn validate(state: &AppState) -> ValidationReport {
    let mut issues = Vec::new();
    let known_users = state.known_user_ids();
    let thread_ids = state.thread_ids();
    let venue_ids = state.venue_ids();

    check_score_bounds(state, &mut issues);
    check_thread_back_references(state, &thread_ids, &mut issues);
    check_rsvp_membership(state, &known_users, &mut issues);
    check_thread_participants(state, &known_users, &mut issues);
    check_venue_references(state, &venue_ids, &mut issues);

    ValidationReport::from_issues(issues)
}

fn check_score_bounds(state: &AppState, issues: &mut Vec<ConsistencyIssue>) {
    let Some(user) = &state.user else {
        return;
    };
    if !(TRUST_POINTS_MIN..=TRUST_POINTS_MAX).contains(&user.trust_points) {
        issues.push(ConsistencyIssue::ScoreOutOfBounds {
            user_id: user.id.clone(),
            found: user.trust_points,
            clamped: clamp_trust_points(user.trust_points),
        });
    }
}

fn check_thread_back_references(
    state: &AppState,
    thread_ids: &HashSet<&ThreadId>,
    issues: &mut Vec<ConsistencyIssue>,
) {
    let Some(user) = &state.user else {
        return;
    };
    let mut seen = HashSet::new();
    for thread_id in &user.thread_ids {
        if !thread_ids.contains(thread_id) && seen.insert(thread_id) {
            issues.push(ConsistencyIssue::DanglingThreadReference {
                user_id: user.id.clone(),
                thread_id: thread_id.clone(),
            });
        }
    }
}

fn check_rsvp_membership(
    state: &AppState,
    known_users: &HashSet<&UserId>,
    issues: &mut Vec<ConsistencyIssue>,
) {
    let mut seen = HashSet::new();
    for event in &state.events {
        for user_id in &event.rsvp_list {
            if !known_users.contains(user_id) && seen.insert((&event.id, user_id)) {
                issues.push(ConsistencyIssue::UnknownRsvpUser {
                    event_id: event.id.clone(),
                    user_id: user_id.clone(),
                });
            }
        }
    }
}

fn check_thread_participants(
    state: &AppState,
    known_users: &HashSet<&UserId>,
    issues: &mut Vec<ConsistencyIssue>,
) {
    let mut seen = HashSet::new();
    for thread in &state.threads {
        for user_id in &thread.participants {
            if !known_users.contains(user_id) && seen.insert((&thread.id, user_id)) {
                issues.push(ConsistencyIssue::UnknownParticipant {
                    thread_id: thread.id.clone(),
                    user_id: user_id.clone(),
                });
            }
        }
    }
}

fn check_venue_references(
    state: &AppState,
    venue_ids: &HashSet<&VenueId>,
    issues: &mut Vec<ConsistencyIssue>,
) {
    let mut seen = HashSet::new();
    for event in &state.events {
        if let Some(venue_id) = &event.venue_id {
            if !venue_ids.contains(venue_id) && seen.insert((&event.id, venue_id)) {
                issues.push(ConsistencyIssue::DanglingVenueReference {
                    event_id: event.id.clone(),
                    venue_id: venue_id.clone(),
                });
            }
        }
    }
}
