//! Domain aggregates for the volunteer/NGO and local-event client.
//!
//! These are the objects the hosted backend returns and the client persists.
//! Temporal fields are optional: a date that fails to revive from
//! storage becomes `None` rather than invalidating the aggregate.

use crate::temporal::lenient;
use crate::{EventId, MessageId, NgoId, ThreadId, Timestamp, UserId, VenueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Volunteer,
    NgoAdmin,
    Organizer,
}

/// The active user's profile aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    /// Reputation score in [0, 100]. Written only by the trust service.
    pub trust_points: i32,
    /// Threads this user participates in ("threads I'm in").
    #[serde(default)]
    pub thread_ids: Vec<ThreadId>,
    #[serde(default)]
    pub identity_verified: bool,
    #[serde(default, with = "lenient")]
    pub joined_at: Option<Timestamp>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, trust_points: i32) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            role: UserRole::Volunteer,
            trust_points,
            thread_ids: Vec::new(),
            identity_verified: false,
            joined_at: None,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Lightweight entry in the available-users directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
}

/// A registered NGO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ngo {
    pub id: NgoId,
    pub name: String,
    pub cause: String,
    #[serde(default)]
    pub city: Option<String>,
    /// Projected from the persisted verification flags.
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub volunteer_count: u32,
}

/// A physical venue events can be held at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub capacity: Option<u32>,
}

/// A local community event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityEvent {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub ngo_id: Option<NgoId>,
    #[serde(default)]
    pub venue_id: Option<VenueId>,
    #[serde(default, with = "lenient")]
    pub starts_at: Option<Timestamp>,
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Users who RSVP'd.
    #[serde(default)]
    pub rsvp_list: Vec<UserId>,
    /// Whether the active user is attending. Projected from the RSVP set.
    #[serde(default)]
    pub is_attending: bool,
}

impl CommunityEvent {
    pub fn has_rsvp(&self, user_id: &UserId) -> bool {
        self.rsvp_list.contains(user_id)
    }
}

/// One message inside a chat thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub body: String,
    #[serde(default, with = "lenient")]
    pub sent_at: Option<Timestamp>,
}

/// A conversation between users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: ThreadId,
    #[serde(default)]
    pub title: Option<String>,
    pub participants: Vec<UserId>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, with = "lenient")]
    pub created_at: Option<Timestamp>,
    #[serde(default, with = "lenient")]
    pub last_message_at: Option<Timestamp>,
}

impl ChatThread {
    /// Most recent activity: the explicit marker, else the newest message,
    /// else creation time. `None` sorts as least recent.
    pub fn last_activity(&self) -> Option<Timestamp> {
        self.last_message_at
            .or_else(|| self.messages.iter().filter_map(|m| m.sent_at).max())
            .or(self.created_at)
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub notifications_enabled: bool,
    #[serde(default)]
    pub preferred_causes: Vec<String>,
    pub search_radius_km: u32,
    #[serde(default, with = "lenient")]
    pub updated_at: Option<Timestamp>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            preferred_causes: Vec::new(),
            search_radius_km: 25,
            updated_at: None,
        }
    }
}

/// Events the user has RSVP'd to, persisted separately from the events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpSet {
    pub user_id: UserId,
    #[serde(default)]
    pub event_ids: BTreeSet<EventId>,
    #[serde(default, with = "lenient")]
    pub updated_at: Option<Timestamp>,
}

impl RsvpSet {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            event_ids: BTreeSet::new(),
            updated_at: None,
        }
    }
}

/// Locally cached verification outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlags {
    pub user_id: UserId,
    #[serde(default)]
    pub identity_verified: bool,
    #[serde(default)]
    pub verified_ngo_ids: BTreeSet<NgoId>,
    #[serde(default, with = "lenient")]
    pub verified_at: Option<Timestamp>,
}
