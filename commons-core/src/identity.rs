//! Identity types for commons entities
//!
//! Ids are opaque strings handed out by the hosted backend. Each entity kind
//! gets its own newtype so a thread id can never be stored where a user id is
//! expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a fresh record id (UUIDv7, timestamp-sortable).
pub fn new_record_id() -> Uuid {
    Uuid::now_v7()
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an id issued by the backend.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a locally generated id.
            pub fn generate() -> Self {
                Self(new_record_id().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Blank ids fail the minimal shape check on load.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a user account.
    UserId
);
define_entity_id!(
    /// Identifier of a registered NGO.
    NgoId
);
define_entity_id!(
    /// Identifier of an event venue.
    VenueId
);
define_entity_id!(
    /// Identifier of a community event.
    EventId
);
define_entity_id!(
    /// Identifier of a chat thread.
    ThreadId
);
define_entity_id!(
    /// Identifier of a single chat message.
    MessageId
);
