//! Startup reconciliation.

use std::sync::Arc;

use commons_core::{
    AppState, ChatThread, Preferences, ReferenceData, ReferenceSource, RsvpSet, SharedClock,
    StorageResult, TrustHistory, VerificationFlags,
};
use commons_integrity::{validate_and_repair, RepairOutcome};
use commons_storage::{KeyValueMedium, SessionStore};
use serde::Serialize;

use crate::projection::{
    project_rsvps, project_verification, snapshot_rsvps, snapshot_verification,
};

/// Result of [`StartupReconciler::initialize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Initialized {
    pub state: AppState,
    /// Whether a persisted session was restored.
    pub has_persisted_data: bool,
    pub repairs: RepairOutcome,
}

/// Builds the initial application state from fresh reference data and
/// whatever the previous session persisted.
pub struct StartupReconciler<M: KeyValueMedium> {
    session: Arc<SessionStore<M>>,
    reference: Arc<dyn ReferenceSource>,
    clock: SharedClock,
}

impl<M: KeyValueMedium> StartupReconciler<M> {
    pub fn new(
        session: Arc<SessionStore<M>>,
        reference: Arc<dyn ReferenceSource>,
        clock: SharedClock,
    ) -> Self {
        Self {
            session,
            reference,
            clock,
        }
    }

    /// Produce a usable, validated state. Never fails.
    ///
    /// Any storage failure while restoring (corrupt record, wrong owner,
    /// unavailable medium) is logged and the fresh baseline is used instead.
    pub async fn initialize(&self) -> Initialized {
        let reference = self.fresh_reference().await;

        let (state, has_persisted_data) = match self.restore(&reference) {
            Ok(Some(state)) => (state, true),
            Ok(None) => {
                tracing::info!(target: "commons::reconcile", "no persisted session, starting fresh");
                (AppState::baseline(reference), false)
            }
            Err(e) => {
                tracing::warn!(
                    target: "commons::reconcile",
                    error = %e,
                    "persisted session unusable, starting fresh"
                );
                (AppState::baseline(reference), false)
            }
        };
        self.finish(state, has_persisted_data)
    }

    async fn fresh_reference(&self) -> ReferenceData {
        match self.reference.load_reference().await {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(
                    target: "commons::reconcile",
                    error = %e,
                    "reference data unavailable, continuing with none"
                );
                ReferenceData::default()
            }
        }
    }

    fn restore(&self, reference: &ReferenceData) -> StorageResult<Option<AppState>> {
        let Some(user) = self.session.try_load_user(None)? else {
            return Ok(None);
        };
        let owner = user.id.clone();

        let threads = self
            .session
            .try_load_owned::<Vec<ChatThread>>(&owner)?
            .unwrap_or_default();
        let preferences = self
            .session
            .try_load_owned::<Preferences>(&owner)?
            .unwrap_or_default();
        let trust_history = self
            .session
            .try_load_owned::<TrustHistory>(&owner)?
            .unwrap_or_default();
        let rsvps = self.session.try_load_owned::<RsvpSet>(&owner)?;
        let verification = self.session.try_load_owned::<VerificationFlags>(&owner)?;

        let mut state = AppState::baseline(reference.clone());
        state.user = Some(user);
        state.threads = threads;
        state.preferences = preferences;
        state.trust_history = trust_history;

        if let Some(rsvps) = rsvps {
            let unmatched = project_rsvps(&mut state, &rsvps);
            if unmatched > 0 {
                tracing::debug!(
                    target: "commons::reconcile",
                    unmatched,
                    "persisted RSVPs name events absent from fresh data"
                );
            }
        }
        if let Some(flags) = verification {
            let unmatched = project_verification(&mut state, &flags);
            if unmatched > 0 {
                tracing::debug!(
                    target: "commons::reconcile",
                    unmatched,
                    "persisted verifications name NGOs absent from fresh data"
                );
            }
        }

        tracing::info!(
            target: "commons::reconcile",
            user_id = %owner,
            threads = state.threads.len(),
            history = state.trust_history.len(),
            "restored persisted session"
        );
        Ok(Some(state))
    }

    fn finish(&self, mut state: AppState, has_persisted_data: bool) -> Initialized {
        let repairs = validate_and_repair(&mut state);
        if has_persisted_data && repairs.applied > 0 {
            self.persist_repaired(&state);
        }
        Initialized {
            state,
            has_persisted_data,
            repairs,
        }
    }

    /// Write back the aggregates a repair can touch, so the same corruption
    /// is not found again next start.
    fn persist_repaired(&self, state: &AppState) {
        let Some(user) = &state.user else {
            return;
        };
        self.session.save_user(user);
        self.session.save_threads(&user.id, &state.threads);
        tracing::info!(target: "commons::reconcile", user_id = %user.id, "persisted repaired session");
    }

    /// Persist every aggregate of the active user's session.
    pub fn persist(&self, state: &AppState) {
        let Some(user) = &state.user else {
            tracing::debug!(target: "commons::reconcile", "no active user, nothing to persist");
            return;
        };
        let now = self.clock.now();
        self.session.save_user(user);
        self.session.save_threads(&user.id, &state.threads);
        self.session.save_preferences(&user.id, &state.preferences);
        self.session.save_trust_history(&user.id, &state.trust_history);
        if let Some(rsvps) = snapshot_rsvps(state, now) {
            self.session.save_rsvps(&rsvps);
        }
        if let Some(flags) = snapshot_verification(state, now) {
            self.session.save_verification(&flags);
        }
    }
}
