//! Persisted record envelope and the aggregate contract.

use commons_core::temporal::lenient;
use commons_core::{
    ChatThread, Preferences, RsvpSet, Timestamp, TrustHistory, User, UserId, ValidationError,
    VerificationFlags, TRUST_POINTS_MAX, TRUST_POINTS_MIN,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::key::AggregateKind;

/// A domain bundle that can be persisted as one record.
pub trait Aggregate: Serialize + DeserializeOwned {
    /// Kind tag written into the envelope and checked on load.
    const KIND: AggregateKind;

    /// Owning user, when the aggregate itself names one.
    fn owner(&self) -> Option<&UserId> {
        None
    }

    /// Minimal shape check run after deserialisation. A failing record is
    /// treated as absent.
    fn validate_shape(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// On-medium wrapper around an aggregate.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedRecord<T> {
    pub version: u32,
    pub kind: String,
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default, with = "lenient")]
    pub saved_at: Option<Timestamp>,
    pub data: T,
}

fn require_id(blank: bool, field: &str) -> Result<(), ValidationError> {
    if blank {
        Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        })
    } else {
        Ok(())
    }
}

impl Aggregate for User {
    const KIND: AggregateKind = AggregateKind::UserProfile;

    fn owner(&self) -> Option<&UserId> {
        Some(&self.id)
    }

    fn validate_shape(&self) -> Result<(), ValidationError> {
        require_id(self.id.is_blank(), "user.id")
    }
}

impl Aggregate for Vec<ChatThread> {
    const KIND: AggregateKind = AggregateKind::ChatThreads;

    fn validate_shape(&self) -> Result<(), ValidationError> {
        for thread in self {
            require_id(thread.id.is_blank(), "thread.id")?;
        }
        Ok(())
    }
}

impl Aggregate for Preferences {
    const KIND: AggregateKind = AggregateKind::Preferences;
}

impl Aggregate for RsvpSet {
    const KIND: AggregateKind = AggregateKind::Rsvps;

    fn owner(&self) -> Option<&UserId> {
        Some(&self.user_id)
    }

    fn validate_shape(&self) -> Result<(), ValidationError> {
        require_id(self.user_id.is_blank(), "rsvps.user_id")
    }
}

impl Aggregate for VerificationFlags {
    const KIND: AggregateKind = AggregateKind::Verification;

    fn owner(&self) -> Option<&UserId> {
        Some(&self.user_id)
    }

    fn validate_shape(&self) -> Result<(), ValidationError> {
        require_id(self.user_id.is_blank(), "verification.user_id")
    }
}

impl Aggregate for TrustHistory {
    const KIND: AggregateKind = AggregateKind::TrustHistory;

    fn validate_shape(&self) -> Result<(), ValidationError> {
        // One transition can move a score at most across the whole interval.
        let span = TRUST_POINTS_MAX - TRUST_POINTS_MIN;
        for entry in self.entries() {
            require_id(entry.user_id.is_blank(), "trust_history.user_id")?;
            if !(-span..=span).contains(&entry.delta) {
                return Err(ValidationError::InvalidValue {
                    field: "trust_history.delta".to_string(),
                    reason: format!("{} is outside [-{span}, {span}]", entry.delta),
                });
            }
        }
        Ok(())
    }
}
