//! The action table and pure score arithmetic.

use commons_core::{clamp_trust_points, LedgerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Something a user did that moves their trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustAction {
    OrganizeEvent,
    AttendEvent,
    NoShow,
    VerifyIdentity,
    ReportViolation,
    VolunteerActivity,
    CommunityContribution,
}

impl TrustAction {
    pub const ALL: [TrustAction; 7] = [
        TrustAction::OrganizeEvent,
        TrustAction::AttendEvent,
        TrustAction::NoShow,
        TrustAction::VerifyIdentity,
        TrustAction::ReportViolation,
        TrustAction::VolunteerActivity,
        TrustAction::CommunityContribution,
    ];

    /// Points this action is worth.
    pub const fn points(self) -> i32 {
        match self {
            TrustAction::OrganizeEvent => 20,
            TrustAction::AttendEvent => 5,
            TrustAction::NoShow => -10,
            TrustAction::VerifyIdentity => 10,
            TrustAction::ReportViolation => -5,
            TrustAction::VolunteerActivity => 15,
            TrustAction::CommunityContribution => 10,
        }
    }

    /// Stable key used in history reasons and configuration.
    pub const fn key(self) -> &'static str {
        match self {
            TrustAction::OrganizeEvent => "ORGANIZE_EVENT",
            TrustAction::AttendEvent => "ATTEND_EVENT",
            TrustAction::NoShow => "NO_SHOW",
            TrustAction::VerifyIdentity => "VERIFY_IDENTITY",
            TrustAction::ReportViolation => "REPORT_VIOLATION",
            TrustAction::VolunteerActivity => "VOLUNTEER_ACTIVITY",
            TrustAction::CommunityContribution => "COMMUNITY_CONTRIBUTION",
        }
    }
}

impl fmt::Display for TrustAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TrustAction {
    type Err = LedgerError;

    /// An unrecognised key is a programmer error and fails fast.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrustAction::ALL
            .into_iter()
            .find(|action| action.key() == s)
            .ok_or_else(|| LedgerError::UnknownAction { key: s.to_string() })
    }
}

/// Points for `action`.
pub fn delta(action: TrustAction) -> i32 {
    action.points()
}

/// New score after `action`, clamped into [0, 100].
pub fn apply_action(current: i32, action: TrustAction) -> i32 {
    clamp_trust_points(current.saturating_add(delta(action)))
}

pub fn meets_threshold(score: i32, minimum: i32) -> bool {
    score >= minimum
}

/// Whether `score` is low enough that risky actions should be warned about.
pub fn is_below_warning(score: i32, warning_threshold: i32) -> bool {
    score < warning_threshold
}
