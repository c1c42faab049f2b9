//! Commons Test Utilities
//!
//! Shared test infrastructure for the commons workspace:
//! - Proptest generators for domain aggregates and application state
//! - Scripted remote collaborators that count their calls
//! - Fixtures for a small, internally consistent community

// Re-export core types for convenience
pub use commons_core::{
    AppState, ChatMessage, ChatThread, CommunityEvent, EventId, ListFilter, MessageId, Ngo, NgoId,
    Page, Preferences, ReferenceData, ReferenceSource, RemoteEntity, RemoteError, RemoteFetcher,
    RsvpSet, ThreadId, Timestamp, User, UserId, UserRole, UserSummary, Venue, VenueId,
    VerificationFlags,
};
pub use commons_trust::TrustAction;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

pub use fixtures::*;
pub use generators::*;

// ============================================================================
// SCRIPTED REMOTE COLLABORATORS
// ============================================================================

/// In-memory backend for one entity kind. Counts every call so tests can
/// tell a cache hit from a remote round trip.
#[derive(Debug)]
pub struct ScriptedFetcher<T> {
    entities: Mutex<BTreeMap<String, T>>,
    entity_calls: AtomicUsize,
    list_calls: AtomicUsize,
    mutate_calls: AtomicUsize,
    failing: AtomicBool,
}

impl<T: RemoteEntity> ScriptedFetcher<T> {
    pub fn new(entities: impl IntoIterator<Item = T>) -> Self {
        Self {
            entities: Mutex::new(
                entities
                    .into_iter()
                    .map(|e| (e.entity_id().to_string(), e))
                    .collect(),
            ),
            entity_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            mutate_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `RequestFailed`.
    pub fn fail_requests(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Replace an entity behind the cache's back.
    pub fn put(&self, entity: T) {
        self.lock().insert(entity.entity_id().to_string(), entity);
    }

    pub fn entity_calls(&self) -> usize {
        self.entity_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn mutate_calls(&self) -> usize {
        self.mutate_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, T>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failing(&self) -> Result<(), RemoteError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RemoteError::RequestFailed {
                kind: T::KIND.to_string(),
                reason: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<T> RemoteFetcher<T> for ScriptedFetcher<T>
where
    T: RemoteEntity + Serialize + DeserializeOwned,
{
    async fn fetch_entity(&self, id: &str) -> Result<Option<T>, RemoteError> {
        self.entity_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.lock().get(id).cloned())
    }

    async fn fetch_list(&self, filter: &ListFilter, page: Page) -> Result<Vec<T>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        let entities = self.lock();
        let matching = entities.values().filter(|entity| match filter {
            ListFilter::All => true,
            ListFilter::Search(query) => entity.entity_id().contains(query.as_str()),
            ListFilter::Field { name, value } => serde_json::to_value(*entity)
                .ok()
                .and_then(|json| json.get(name).cloned())
                .is_some_and(|field| field.as_str() == Some(value.as_str())),
        });
        Ok(matching
            .skip(page.index.saturating_mul(page.size) as usize)
            .take(page.size as usize)
            .cloned()
            .collect())
    }

    async fn mutate_entity(&self, id: &str, patch: Value) -> Result<T, RemoteError> {
        self.mutate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        let mut entities = self.lock();
        let current = entities.get(id).ok_or_else(|| RemoteError::NotFound {
            kind: T::KIND.to_string(),
            id: id.to_string(),
        })?;
        let rejected = |reason: String| RemoteError::Rejected {
            kind: T::KIND.to_string(),
            id: id.to_string(),
            reason,
        };
        let mut json = serde_json::to_value(current).map_err(|e| rejected(e.to_string()))?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut json, patch) {
            target.extend(fields);
        }
        let updated: T = serde_json::from_value(json).map_err(|e| rejected(e.to_string()))?;
        entities.insert(id.to_string(), updated.clone());
        Ok(updated)
    }
}

/// Reference source that always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingReference;

#[async_trait]
impl ReferenceSource for FailingReference {
    async fn load_reference(&self) -> Result<ReferenceData, RemoteError> {
        Err(RemoteError::RequestFailed {
            kind: "reference".to_string(),
            reason: "backend unreachable".to_string(),
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for commons domain types.

    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use proptest::sample::select;

    // === Identity ===

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        "[a-z]{1,8}-[0-9]{1,4}".prop_map(UserId::new)
    }

    pub fn arb_thread_id() -> impl Strategy<Value = ThreadId> {
        "t-[0-9]{1,6}".prop_map(ThreadId::new)
    }

    /// Millisecond-precision instant between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800_000i64..1_893_456_000_000i64)
            .prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now))
    }

    // === Enums ===

    pub fn arb_trust_action() -> impl Strategy<Value = TrustAction> {
        select(TrustAction::ALL.to_vec())
    }

    pub fn arb_user_role() -> impl Strategy<Value = UserRole> {
        prop_oneof![
            Just(UserRole::Volunteer),
            Just(UserRole::NgoAdmin),
            Just(UserRole::Organizer),
        ]
    }

    // === Aggregates ===

    /// A user whose score may lie outside [0, 100].
    pub fn arb_user() -> impl Strategy<Value = User> {
        (
            arb_user_id(),
            "[A-Z][a-z]{1,10}",
            arb_user_role(),
            -50i32..200,
            prop::collection::vec(arb_thread_id(), 0..4),
            any::<bool>(),
            prop::option::of(arb_timestamp()),
        )
            .prop_map(
                |(id, name, role, trust_points, thread_ids, identity_verified, joined_at)| User {
                    id,
                    name,
                    email: None,
                    role,
                    trust_points,
                    thread_ids,
                    identity_verified,
                    joined_at,
                },
            )
    }

    pub fn arb_chat_message() -> impl Strategy<Value = ChatMessage> {
        ("m-[0-9]{1,6}", arb_user_id(), ".{0,40}", prop::option::of(arb_timestamp())).prop_map(
            |(id, sender_id, body, sent_at)| ChatMessage {
                id: MessageId::new(id),
                sender_id,
                body,
                sent_at,
            },
        )
    }

    pub fn arb_chat_thread() -> impl Strategy<Value = ChatThread> {
        (
            arb_thread_id(),
            prop::option::of("[a-z ]{1,20}"),
            prop::collection::vec(arb_user_id(), 1..4),
            prop::collection::vec(arb_chat_message(), 0..6),
            prop::option::of(arb_timestamp()),
            prop::option::of(arb_timestamp()),
        )
            .prop_map(
                |(id, title, participants, messages, created_at, last_message_at)| ChatThread {
                    id,
                    title,
                    participants,
                    messages,
                    created_at,
                    last_message_at,
                },
            )
    }

    /// Application state mixing valid references with dangling ones.
    ///
    /// Event and thread ids repeat once a collection passes four entries, as
    /// they can in persisted data. References are drawn from pools holding
    /// known ids, the active user, and ghosts.
    pub fn arb_app_state() -> impl Strategy<Value = AppState> {
        (0usize..5, 0usize..4, 0usize..6, 0usize..6, any::<bool>()).prop_flat_map(
            |(n_users, n_venues, n_events, n_threads, has_user)| {
                let mut user_pool: Vec<UserId> =
                    (0..n_users).map(|i| UserId::new(format!("u-{i}"))).collect();
                user_pool.push(UserId::new("me"));
                user_pool.push(UserId::new("ghost-1"));
                user_pool.push(UserId::new("ghost-2"));

                let mut venue_pool: Vec<VenueId> =
                    (0..n_venues).map(|i| VenueId::new(format!("v-{i}"))).collect();
                venue_pool.push(VenueId::new("v-gone"));

                let mut thread_pool: Vec<ThreadId> =
                    (0..n_threads).map(|i| ThreadId::new(format!("t-{i}"))).collect();
                thread_pool.push(ThreadId::new("t-gone"));

                (
                    prop::collection::vec(
                        prop::collection::vec(select(user_pool.clone()), 0..5),
                        n_events,
                    ),
                    prop::collection::vec(prop::option::of(select(venue_pool)), n_events),
                    prop::collection::vec(
                        prop::collection::vec(select(user_pool), 0..5),
                        n_threads,
                    ),
                    prop::collection::vec(select(thread_pool), 0..5),
                    -50i32..200,
                    Just((n_users, n_venues, has_user)),
                )
            },
        )
        .prop_map(
            |(rsvps, event_venues, participants, user_threads, points, (n_users, n_venues, has_user))| {
                let reference = ReferenceData {
                    ngos: Vec::new(),
                    venues: (0..n_venues)
                        .map(|i| venue(&format!("v-{i}"), "Springfield"))
                        .collect(),
                    events: rsvps
                        .into_iter()
                        .zip(event_venues)
                        .enumerate()
                        .map(|(i, (rsvp_list, venue_id))| CommunityEvent {
                            venue_id,
                            rsvp_list,
                            ..event(&format!("e-{}", i % 4), None)
                        })
                        .collect(),
                    available_users: (0..n_users)
                        .map(|i| summary(&format!("u-{i}"), "Member"))
                        .collect(),
                };
                let mut state = AppState::baseline(reference);
                state.threads = participants
                    .into_iter()
                    .enumerate()
                    .map(|(i, participants)| ChatThread {
                        participants,
                        ..thread(&format!("t-{}", i % 4), &[])
                    })
                    .collect();
                if has_user {
                    let mut user = User::new(UserId::new("me"), "Me", points);
                    user.thread_ids = user_threads;
                    state.user = Some(user);
                }
                state
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! A small, internally consistent community.
    //!
    //! `sample_state()` validates clean: the active user `u-active` is not in
    //! the available-users directory, is RSVP'd to `e-2`, and shares thread
    //! `t-1` with `u-2`.

    use super::*;

    pub fn summary(id: &str, name: &str) -> UserSummary {
        UserSummary {
            id: UserId::new(id),
            name: name.to_string(),
            role: UserRole::Volunteer,
        }
    }

    pub fn ngo(id: &str, name: &str, cause: &str) -> Ngo {
        Ngo {
            id: NgoId::new(id),
            name: name.to_string(),
            cause: cause.to_string(),
            city: None,
            verified: false,
            volunteer_count: 0,
        }
    }

    pub fn venue(id: &str, city: &str) -> Venue {
        Venue {
            id: VenueId::new(id),
            name: format!("Hall {id}"),
            city: city.to_string(),
            capacity: None,
        }
    }

    pub fn event(id: &str, venue_id: Option<&str>) -> CommunityEvent {
        CommunityEvent {
            id: EventId::new(id),
            title: format!("Event {id}"),
            ngo_id: None,
            venue_id: venue_id.map(VenueId::new),
            starts_at: None,
            capacity: None,
            rsvp_list: Vec::new(),
            is_attending: false,
        }
    }

    pub fn thread(id: &str, participants: &[&str]) -> ChatThread {
        ChatThread {
            id: ThreadId::new(id),
            title: None,
            participants: participants.iter().copied().map(UserId::new).collect(),
            messages: Vec::new(),
            created_at: None,
            last_message_at: None,
        }
    }

    pub fn sample_user() -> User {
        let mut user = User::new(UserId::new("u-active"), "Ada", 50);
        user.thread_ids = vec![ThreadId::new("t-1")];
        user
    }

    pub fn sample_reference() -> ReferenceData {
        ReferenceData {
            ngos: vec![
                ngo("n-1", "River Cleanup", "environment"),
                ngo("n-2", "Food Bank", "hunger"),
            ],
            venues: vec![venue("v-1", "Springfield"), venue("v-2", "Shelbyville")],
            events: vec![
                CommunityEvent {
                    ngo_id: Some(NgoId::new("n-1")),
                    rsvp_list: vec![UserId::new("u-2"), UserId::new("u-3")],
                    ..event("e-1", Some("v-1"))
                },
                CommunityEvent {
                    ngo_id: Some(NgoId::new("n-2")),
                    ..event("e-2", Some("v-2"))
                },
            ],
            available_users: vec![summary("u-2", "Bo"), summary("u-3", "Cy")],
        }
    }

    pub fn sample_threads() -> Vec<ChatThread> {
        vec![thread("t-1", &["u-active", "u-2"])]
    }

    /// Reference data plus the active user, their RSVP and their thread.
    pub fn sample_state() -> AppState {
        let mut state = AppState::baseline(sample_reference());
        state.user = Some(sample_user());
        state.threads = sample_threads();
        if let Some(event) = state.events.iter_mut().find(|e| e.id.as_str() == "e-2") {
            event.rsvp_list.push(UserId::new("u-active"));
            event.is_attending = true;
        }
        state
    }
}
