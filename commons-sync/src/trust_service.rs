//! Trust mutations: arithmetic, audit, persistence, and cache upkeep in one
//! step.

use std::sync::Arc;

use commons_core::{clamp_trust_points, AppState, LedgerError, User};
use commons_storage::{KeyValueMedium, SessionStore};
use commons_trust::{apply_action, TrustAction, TrustLedger};

use crate::remote::CachedRemote;

/// The only writer of a user's trust score.
pub struct TrustService<M: KeyValueMedium> {
    ledger: TrustLedger,
    session: Arc<SessionStore<M>>,
    remote: CachedRemote,
}

impl<M: KeyValueMedium> TrustService<M> {
    pub fn new(ledger: TrustLedger, session: Arc<SessionStore<M>>, remote: CachedRemote) -> Self {
        Self {
            ledger,
            session,
            remote,
        }
    }

    pub fn ledger(&self) -> &TrustLedger {
        &self.ledger
    }

    /// Apply `action` to the active user and return the new score.
    ///
    /// The history entry records the clamped change, so a user at 5 who no-shows
    /// is recorded as -5, not -10.
    pub fn apply(
        &self,
        state: &mut AppState,
        action: TrustAction,
        related_entity_id: Option<String>,
    ) -> Result<i32, LedgerError> {
        let Some(user) = state.user.as_mut() else {
            return Err(LedgerError::NoActiveUser {
                action: action.key().to_string(),
            });
        };
        // An unrepaired out-of-range score counts from its nearest bound.
        let before = clamp_trust_points(user.trust_points);
        let after = apply_action(before, action);
        user.trust_points = after;
        let user_id = user.id.clone();

        self.ledger.record_action(
            &mut state.trust_history,
            &user_id,
            action,
            after - before,
            related_entity_id,
        );
        if self.ledger.is_warning(after) {
            tracing::info!(target: "commons::trust", user_id = %user_id, score = after, "trust score below warning threshold");
        }

        if let Some(user) = &state.user {
            self.session.save_user(user);
        }
        self.session.save_trust_history(&user_id, &state.trust_history);
        let dropped = self.remote.invalidate_entity::<User>(user_id.as_str());
        tracing::debug!(target: "commons::trust", user_id = %user_id, before, after, dropped, "trust action applied");
        Ok(after)
    }

    /// Parse an action key and apply it. Unknown keys fail fast.
    pub fn apply_key(
        &self,
        state: &mut AppState,
        key: &str,
        related_entity_id: Option<String>,
    ) -> Result<i32, LedgerError> {
        let action: TrustAction = key.parse()?;
        self.apply(state, action, related_entity_id)
    }
}
