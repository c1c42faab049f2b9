//! Namespaced aggregate keys.
//!
//! Per-user aggregates cannot be addressed without naming their owner, so a
//! session for user A never reads user B's records by accident.

use commons_core::UserId;
use std::fmt;

/// Logical kind of a persisted aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    /// The active user's profile. Lives in a single session slot.
    UserProfile,
    ChatThreads,
    Preferences,
    Rsvps,
    Verification,
    TrustHistory,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 6] = [
        AggregateKind::UserProfile,
        AggregateKind::ChatThreads,
        AggregateKind::Preferences,
        AggregateKind::Rsvps,
        AggregateKind::Verification,
        AggregateKind::TrustHistory,
    ];

    /// Key segment and envelope tag.
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateKind::UserProfile => "user",
            AggregateKind::ChatThreads => "threads",
            AggregateKind::Preferences => "prefs",
            AggregateKind::Rsvps => "rsvps",
            AggregateKind::Verification => "verification",
            AggregateKind::TrustHistory => "trust-history",
        }
    }

    /// Whether the owning user id is part of the storage key.
    pub fn is_user_scoped(self) -> bool {
        !matches!(self, AggregateKind::UserProfile)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage key for one aggregate.
///
/// The owner is always checked against the stored envelope on load. For
/// user-scoped kinds it is also part of the encoded key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    namespace: String,
    kind: AggregateKind,
    owner: Option<UserId>,
}

impl AggregateKey {
    /// Key for the session profile slot. `expected_owner`, when given, must
    /// match the stored profile for a load to succeed.
    pub fn session(namespace: impl Into<String>, expected_owner: Option<UserId>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: AggregateKind::UserProfile,
            owner: expected_owner,
        }
    }

    /// Key for an aggregate owned by `owner`.
    pub fn owned(namespace: impl Into<String>, kind: AggregateKind, owner: UserId) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            owner: Some(owner),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    pub fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    /// Encode to the string stored in the medium.
    pub fn encode(&self) -> String {
        match (&self.owner, self.kind.is_user_scoped()) {
            (Some(owner), true) => format!("{}:{}:{}", self.namespace, self.kind, owner),
            _ => format!("{}:{}", self.namespace, self.kind),
        }
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
