//! History recording and audit summaries.

use commons_core::{
    new_record_id, SharedClock, SystemClock, TrustHistory, TrustPointsHistoryEntry, TrustSettings,
    UserId,
};
use serde::{Deserialize, Serialize};

use crate::action::{is_below_warning, TrustAction};

/// Totals over one user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSummary {
    pub user_id: UserId,
    pub entries: usize,
    pub gained: i64,
    pub lost: i64,
}

impl TrustSummary {
    /// Net change, equal to the score movement the history accounts for.
    pub fn net(&self) -> i64 {
        self.gained - self.lost
    }
}

/// Records trust transitions against an injected clock.
#[derive(Clone)]
pub struct TrustLedger {
    clock: SharedClock,
    warning_threshold: i32,
}

impl TrustLedger {
    pub fn new(settings: &TrustSettings, clock: SharedClock) -> Self {
        Self {
            clock,
            warning_threshold: settings.warning_threshold,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&TrustSettings::default(), SystemClock::shared())
    }

    pub fn warning_threshold(&self) -> i32 {
        self.warning_threshold
    }

    pub fn is_warning(&self, score: i32) -> bool {
        is_below_warning(score, self.warning_threshold)
    }

    /// Append one entry to `history` and return a copy of it.
    ///
    /// `delta` should be the applied change after clamping so the history
    /// replays to the stored score.
    pub fn record_history(
        &self,
        history: &mut TrustHistory,
        user_id: &UserId,
        delta: i32,
        reason: impl Into<String>,
        related_entity_id: Option<String>,
    ) -> TrustPointsHistoryEntry {
        let entry = TrustPointsHistoryEntry {
            entry_id: new_record_id(),
            user_id: user_id.clone(),
            delta,
            reason: reason.into(),
            related_entity_id,
            timestamp: Some(self.clock.now()),
        };
        history.append(entry.clone());
        tracing::info!(
            target: "commons::trust",
            user_id = %user_id,
            delta,
            reason = %entry.reason,
            entry_id = %entry.entry_id,
            "trust history recorded"
        );
        entry
    }

    /// Record `action` with its key as the reason.
    pub fn record_action(
        &self,
        history: &mut TrustHistory,
        user_id: &UserId,
        action: TrustAction,
        applied_delta: i32,
        related_entity_id: Option<String>,
    ) -> TrustPointsHistoryEntry {
        self.record_history(history, user_id, applied_delta, action.key(), related_entity_id)
    }

    /// Totals accumulate in `i64` so no run of `i32` deltas can overflow.
    pub fn summary(&self, history: &TrustHistory, user_id: &UserId) -> TrustSummary {
        let mut summary = TrustSummary {
            user_id: user_id.clone(),
            entries: 0,
            gained: 0,
            lost: 0,
        };
        for entry in history.for_user(user_id) {
            summary.entries += 1;
            if entry.delta >= 0 {
                summary.gained += i64::from(entry.delta);
            } else {
                summary.lost -= i64::from(entry.delta);
            }
        }
        summary
    }
}

impl std::fmt::Debug for TrustLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustLedger")
            .field("warning_threshold", &self.warning_threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use commons_core::ManualClock;
    use std::sync::Arc;

    fn ledger() -> (TrustLedger, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        let ledger = TrustLedger::new(&TrustSettings::default(), Arc::new(clock.clone()));
        (ledger, clock)
    }

    #[test]
    fn test_record_history_appends_and_stamps() {
        let (ledger, clock) = ledger();
        let mut history = TrustHistory::new();
        let user = UserId::new("u-1");

        let first = ledger.record_history(&mut history, &user, 5, "ATTEND_EVENT", Some("e-1".into()));
        clock.advance_ms(1_000);
        let second = ledger.record_action(&mut history, &user, TrustAction::NoShow, -10, None);

        assert_eq!(history.entries(), &[first.clone(), second.clone()]);
        assert_eq!(first.timestamp, Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()));
        assert_eq!(second.reason, "NO_SHOW");
        assert_ne!(first.entry_id, second.entry_id);
    }

    #[test]
    fn test_recording_never_rewrites_prior_entries() {
        let (ledger, _) = ledger();
        let mut history = TrustHistory::new();
        let user = UserId::new("u-1");
        let first = ledger.record_history(&mut history, &user, 20, "ORGANIZE_EVENT", None);
        for _ in 0..5 {
            ledger.record_history(&mut history, &user, 5, "ATTEND_EVENT", None);
        }
        assert_eq!(history.entries()[0], first);
        assert_eq!(history.len(), 6);
    }

    #[test]
    fn test_summary_totals_one_user() {
        let (ledger, _) = ledger();
        let mut history = TrustHistory::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        ledger.record_history(&mut history, &alice, 20, "ORGANIZE_EVENT", None);
        ledger.record_history(&mut history, &alice, -10, "NO_SHOW", None);
        ledger.record_history(&mut history, &bob, 5, "ATTEND_EVENT", None);

        let summary = ledger.summary(&history, &alice);
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.gained, 20);
        assert_eq!(summary.lost, 10);
        assert_eq!(summary.net(), 10);
    }

    #[test]
    fn test_summary_survives_extreme_deltas() {
        let (ledger, _) = ledger();
        let mut history = TrustHistory::new();
        let user = UserId::new("u-1");
        ledger.record_history(&mut history, &user, i32::MAX, "IMPORTED", None);
        ledger.record_history(&mut history, &user, 5, "ATTEND_EVENT", None);
        ledger.record_history(&mut history, &user, i32::MIN, "IMPORTED", None);

        let summary = ledger.summary(&history, &user);
        assert_eq!(summary.gained, i64::from(i32::MAX) + 5);
        assert_eq!(summary.lost, -i64::from(i32::MIN));
        assert_eq!(summary.net(), 4);
    }

    #[test]
    fn test_warning_uses_configured_threshold() {
        let (ledger, _) = ledger();
        assert_eq!(ledger.warning_threshold(), 30);
        assert!(ledger.is_warning(10));
        assert!(!ledger.is_warning(50));
    }
}
