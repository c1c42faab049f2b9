//! Typed persistence for the aggregates a client session keeps.

use std::cmp::Reverse;

use commons_core::{
    ChatThread, Preferences, RsvpSet, StorageResult, StorageSettings, TrustHistory, User, UserId,
    VerificationFlags,
};

use super::key::AggregateKind;
use super::medium::KeyValueMedium;
use super::record::Aggregate;
use super::store::DurableStore;

/// Session-level facade over [`DurableStore`].
///
/// Knows which key each aggregate lives under and applies the size
/// discipline for list-shaped aggregates before writing.
pub struct SessionStore<M: KeyValueMedium> {
    store: DurableStore<M>,
    max_threads: usize,
    max_messages_per_thread: usize,
}

impl<M: KeyValueMedium> SessionStore<M> {
    pub fn new(store: DurableStore<M>, settings: &StorageSettings) -> Self {
        Self {
            store,
            max_threads: settings.max_threads,
            max_messages_per_thread: settings.max_messages_per_thread,
        }
    }

    /// The underlying store, for `try_*` diagnostics.
    pub fn store(&self) -> &DurableStore<M> {
        &self.store
    }

    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    // === User profile ===

    pub fn save_user(&self, user: &User) {
        self.store.save(&self.store.session_key(None), user);
    }

    /// Load the session profile. With `expected`, a profile belonging to any
    /// other user reads as absent.
    pub fn load_user(&self, expected: Option<&UserId>) -> Option<User> {
        self.store.load(&self.store.session_key(expected))
    }

    /// Like [`Self::load_user`], but reports why a stored profile is unusable.
    pub fn try_load_user(&self, expected: Option<&UserId>) -> StorageResult<Option<User>> {
        self.store.try_load(&self.store.session_key(expected))
    }

    /// Load any user-scoped aggregate by its kind, reporting failures.
    pub fn try_load_owned<T: Aggregate>(&self, owner: &UserId) -> StorageResult<Option<T>> {
        self.store.try_load(&self.store.owned_key(T::KIND, owner))
    }

    // === Chat threads ===

    /// Persist chat history, keeping only the most recently active threads and
    /// the newest messages of each.
    pub fn save_threads(&self, owner: &UserId, threads: &[ChatThread]) {
        let bounded = truncate_threads(threads, self.max_threads, self.max_messages_per_thread);
        if bounded.len() < threads.len() {
            tracing::debug!(
                target: "commons::store",
                owner = %owner,
                kept = bounded.len(),
                dropped = threads.len() - bounded.len(),
                "truncated chat history before persisting"
            );
        }
        self.store
            .save(&self.store.owned_key(AggregateKind::ChatThreads, owner), &bounded);
    }

    pub fn load_threads(&self, owner: &UserId) -> Option<Vec<ChatThread>> {
        self.store
            .load(&self.store.owned_key(AggregateKind::ChatThreads, owner))
    }

    // === Preferences ===

    pub fn save_preferences(&self, owner: &UserId, preferences: &Preferences) {
        self.store
            .save(&self.store.owned_key(AggregateKind::Preferences, owner), preferences);
    }

    pub fn load_preferences(&self, owner: &UserId) -> Option<Preferences> {
        self.store
            .load(&self.store.owned_key(AggregateKind::Preferences, owner))
    }

    // === RSVPs ===

    pub fn save_rsvps(&self, rsvps: &RsvpSet) {
        self.store
            .save(&self.store.owned_key(AggregateKind::Rsvps, &rsvps.user_id), rsvps);
    }

    pub fn load_rsvps(&self, owner: &UserId) -> Option<RsvpSet> {
        self.store
            .load(&self.store.owned_key(AggregateKind::Rsvps, owner))
    }

    // === Verification ===

    pub fn save_verification(&self, flags: &VerificationFlags) {
        self.store.save(
            &self.store.owned_key(AggregateKind::Verification, &flags.user_id),
            flags,
        );
    }

    pub fn load_verification(&self, owner: &UserId) -> Option<VerificationFlags> {
        self.store
            .load(&self.store.owned_key(AggregateKind::Verification, owner))
    }

    // === Trust history ===

    pub fn save_trust_history(&self, owner: &UserId, history: &TrustHistory) {
        self.store
            .save(&self.store.owned_key(AggregateKind::TrustHistory, owner), history);
    }

    pub fn load_trust_history(&self, owner: &UserId) -> Option<TrustHistory> {
        self.store
            .load(&self.store.owned_key(AggregateKind::TrustHistory, owner))
    }

    // === Reset ===

    /// Remove every aggregate owned by `owner`, and the session profile if it
    /// is theirs.
    pub fn clear_user(&self, owner: &UserId) {
        for kind in AggregateKind::ALL {
            if kind.is_user_scoped() {
                self.store.clear(&self.store.owned_key(kind, owner));
            }
        }
        let profile_key = self.store.session_key(Some(owner));
        if matches!(self.store.try_load::<User>(&profile_key), Ok(Some(_))) {
            self.store.clear(&profile_key);
        }
    }

    /// Logout/reset: remove everything in the namespace.
    pub fn clear_all(&self) -> usize {
        self.store.clear_all("")
    }
}

/// Keep the `max_threads` most recently active threads, newest first, each
/// capped to its newest `max_messages` messages. Threads with no known
/// activity time are dropped first.
pub fn truncate_threads(
    threads: &[ChatThread],
    max_threads: usize,
    max_messages: usize,
) -> Vec<ChatThread> {
    let mut ordered: Vec<&ChatThread> = threads.iter().collect();
    // Stable sort: ties keep their original relative order.
    ordered.sort_by_key(|thread| Reverse(thread.last_activity()));
    ordered
        .into_iter()
        .take(max_threads)
        .map(|thread| {
            let mut thread = thread.clone();
            if thread.messages.len() > max_messages {
                let excess = thread.messages.len() - max_messages;
                thread.messages.drain(..excess);
            }
            thread
        })
        .collect()
}
