//! Consistency issues as data: one variant per checked invariant.

use commons_core::{EventId, ThreadId, UserId, VenueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One detected invariant violation, carrying what its repair needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyIssue {
    /// Trust score outside [0, 100]. Repair: set to `clamped`.
    ScoreOutOfBounds {
        user_id: UserId,
        found: i32,
        clamped: i32,
    },
    /// User lists a thread that does not exist. Repair: drop the id.
    DanglingThreadReference { user_id: UserId, thread_id: ThreadId },
    /// Event RSVP names an unknown user. Repair: drop the id.
    UnknownRsvpUser { event_id: EventId, user_id: UserId },
    /// Thread participant is an unknown user. Repair: drop the participant.
    UnknownParticipant { thread_id: ThreadId, user_id: UserId },
    /// Event points at an unknown venue. Repair: unset the venue.
    DanglingVenueReference { event_id: EventId, venue_id: VenueId },
}

impl ConsistencyIssue {
    /// Short machine-readable tag, matching the serialized `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsistencyIssue::ScoreOutOfBounds { .. } => "score_out_of_bounds",
            ConsistencyIssue::DanglingThreadReference { .. } => "dangling_thread_reference",
            ConsistencyIssue::UnknownRsvpUser { .. } => "unknown_rsvp_user",
            ConsistencyIssue::UnknownParticipant { .. } => "unknown_participant",
            ConsistencyIssue::DanglingVenueReference { .. } => "dangling_venue_reference",
        }
    }
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyIssue::ScoreOutOfBounds {
                user_id,
                found,
                clamped,
            } => write!(
                f,
                "user {user_id} has trust score {found}, outside [0, 100] (clamp to {clamped})"
            ),
            ConsistencyIssue::DanglingThreadReference { user_id, thread_id } => {
                write!(f, "user {user_id} references missing thread {thread_id}")
            }
            ConsistencyIssue::UnknownRsvpUser { event_id, user_id } => {
                write!(f, "event {event_id} has RSVP from unknown user {user_id}")
            }
            ConsistencyIssue::UnknownParticipant { thread_id, user_id } => {
                write!(f, "thread {thread_id} lists unknown participant {user_id}")
            }
            ConsistencyIssue::DanglingVenueReference { event_id, venue_id } => {
                write!(f, "event {event_id} references missing venue {venue_id}")
            }
        }
    }
}
