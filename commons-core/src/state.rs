//! Live application state and the reference data it is built from.

use crate::{
    ChatThread, CommunityEvent, EventId, Ngo, Preferences, ThreadId, TrustHistory, User, UserId,
    UserSummary, Venue, VenueId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Freshly fetched or generated reference data. Forms the base of every merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub ngos: Vec<Ngo>,
    pub venues: Vec<Venue>,
    pub events: Vec<CommunityEvent>,
    pub available_users: Vec<UserSummary>,
}

/// In-memory application state: the single mutable owner of live aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub user: Option<User>,
    pub available_users: Vec<UserSummary>,
    pub ngos: Vec<Ngo>,
    pub venues: Vec<Venue>,
    pub events: Vec<CommunityEvent>,
    pub threads: Vec<ChatThread>,
    pub preferences: Preferences,
    pub trust_history: TrustHistory,
}

impl AppState {
    /// Baseline state with no active user.
    pub fn baseline(reference: ReferenceData) -> Self {
        Self {
            user: None,
            available_users: reference.available_users,
            ngos: reference.ngos,
            venues: reference.venues,
            events: reference.events,
            threads: Vec::new(),
            preferences: Preferences::default(),
            trust_history: TrustHistory::new(),
        }
    }

    pub fn active_user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    /// Active user plus everyone in the available-users directory.
    pub fn known_user_ids(&self) -> HashSet<&UserId> {
        self.available_users
            .iter()
            .map(|u| &u.id)
            .chain(self.active_user_id())
            .collect()
    }

    pub fn thread_ids(&self) -> HashSet<&ThreadId> {
        self.threads.iter().map(|t| &t.id).collect()
    }

    pub fn venue_ids(&self) -> HashSet<&VenueId> {
        self.venues.iter().map(|v| &v.id).collect()
    }

    /// Every event carrying `id`. Persisted data may hold duplicates.
    pub fn events_with_id_mut<'a>(
        &'a mut self,
        id: &'a EventId,
    ) -> impl Iterator<Item = &'a mut CommunityEvent> + 'a {
        self.events.iter_mut().filter(move |e| &e.id == id)
    }

    /// Every thread carrying `id`.
    pub fn threads_with_id_mut<'a>(
        &'a mut self,
        id: &'a ThreadId,
    ) -> impl Iterator<Item = &'a mut ChatThread> + 'a {
        self.threads.iter_mut().filter(move |t| &t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserRole;

    #[test]
    fn test_known_users_include_active_user() {
        let mut state = AppState::baseline(ReferenceData {
            available_users: vec![UserSummary {
                id: UserId::new("u-2"),
                name: "Bo".to_string(),
                role: UserRole::Volunteer,
            }],
            ..Default::default()
        });
        assert_eq!(state.known_user_ids().len(), 1);

        state.user = Some(User::new(UserId::new("u-1"), "Ada", 50));
        let known = state.known_user_ids();
        assert!(known.contains(&UserId::new("u-1")));
        assert!(known.contains(&UserId::new("u-2")));
    }

    #[test]
    fn test_events_with_id_yields_every_duplicate() {
        let event = CommunityEvent {
            id: EventId::new("e-1"),
            title: "Cleanup".to_string(),
            ngo_id: None,
            venue_id: None,
            starts_at: None,
            capacity: None,
            rsvp_list: Vec::new(),
            is_attending: false,
        };
        let mut state = AppState::baseline(ReferenceData {
            events: vec![event.clone(), event],
            ..Default::default()
        });
        let id = EventId::new("e-1");
        for event in state.events_with_id_mut(&id) {
            event.rsvp_list.push(UserId::new("u-9"));
        }
        assert!(state.events.iter().all(|e| e.rsvp_list == vec![UserId::new("u-9")]));
    }
}
