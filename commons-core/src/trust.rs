//! Trust-score bounds and the append-only history record.
//!
//! The arithmetic lives in `commons-trust`; this module only holds the data
//! shapes so the validator and the persistence layer can share them.

use crate::temporal::lenient;
use crate::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest representable trust score.
pub const TRUST_POINTS_MIN: i32 = 0;

/// Highest representable trust score.
pub const TRUST_POINTS_MAX: i32 = 100;

/// Clamp any integer into the closed trust interval.
pub fn clamp_trust_points(points: i32) -> i32 {
    points.clamp(TRUST_POINTS_MIN, TRUST_POINTS_MAX)
}

/// One audited trust-score transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPointsHistoryEntry {
    pub entry_id: Uuid,
    pub user_id: UserId,
    /// Applied change after clamping, so replaying deltas reproduces the score.
    pub delta: i32,
    pub reason: String,
    #[serde(default)]
    pub related_entity_id: Option<String>,
    #[serde(default, with = "lenient")]
    pub timestamp: Option<Timestamp>,
}

/// Append-only list of trust transitions.
///
/// Entries cannot be edited or removed once recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustHistory {
    entries: Vec<TrustPointsHistoryEntry>,
}

impl TrustHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the end of the history.
    pub fn append(&mut self, entry: TrustPointsHistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TrustPointsHistoryEntry] {
        &self.entries
    }

    pub fn for_user<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> impl Iterator<Item = &'a TrustPointsHistoryEntry> + 'a {
        self.entries.iter().filter(move |e| &e.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TrustPointsHistoryEntry> {
        self.entries.last()
    }
}
