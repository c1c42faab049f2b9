//! Commons Core - Entity Types
//!
//! Pure data structures shared by every other crate in the workspace: typed
//! identifiers, the domain aggregates the client persists, the live
//! application state, the error taxonomy, the clock abstraction, engine
//! configuration, and the contracts for the remote backend. Business logic
//! lives in the component crates.

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod remote;
pub mod state;
pub mod temporal;
pub mod trust;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{CacheSettings, EngineConfig, StorageSettings, TierSettings, TrustSettings};
pub use domain::{
    ChatMessage, ChatThread, CommunityEvent, Ngo, Preferences, RsvpSet, User, UserRole,
    UserSummary, VerificationFlags, Venue,
};
pub use error::{
    CommonsError, CommonsResult, ConfigError, LedgerError, RemoteError, StorageError,
    StorageResult, ValidationError,
};
pub use identity::{new_record_id, EventId, MessageId, NgoId, ThreadId, Timestamp, UserId, VenueId};
pub use remote::{
    ListFilter, Page, ReferenceSource, RemoteEntity, RemoteFetcher, StaticReference,
};
pub use state::{AppState, ReferenceData};
pub use trust::{
    clamp_trust_points, TrustHistory, TrustPointsHistoryEntry, TRUST_POINTS_MAX,
    TRUST_POINTS_MIN,
};
