//! Remote collaborator contracts.
//!
//! The hosted backend is reached through these traits. Transport is the
//! implementor's concern; the engine only wraps results with caching.

use async_trait::async_trait;
use serde_json::Value;

use crate::{ChatThread, CommunityEvent, Ngo, RemoteError, ReferenceData, User, Venue};

/// An entity kind the backend serves.
pub trait RemoteEntity: Clone + Send + Sync + 'static {
    /// Kind name, also the cache key prefix (`"ngos"`, `"events"`, ...).
    const KIND: &'static str;

    fn entity_id(&self) -> &str;
}

impl RemoteEntity for Ngo {
    const KIND: &'static str = "ngos";

    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

impl RemoteEntity for Venue {
    const KIND: &'static str = "venues";

    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

impl RemoteEntity for CommunityEvent {
    const KIND: &'static str = "events";

    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

impl RemoteEntity for User {
    const KIND: &'static str = "users";

    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

impl RemoteEntity for ChatThread {
    const KIND: &'static str = "threads";

    fn entity_id(&self) -> &str {
        self.id.as_str()
    }
}

/// Which slice of a collection to list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListFilter {
    All,
    /// Free-text search.
    Search(String),
    /// Equality on one field, e.g. events of one NGO.
    Field { name: String, value: String },
}

impl ListFilter {
    /// Search results churn faster than full listings.
    pub fn is_search(&self) -> bool {
        matches!(self, ListFilter::Search(_))
    }

    /// Cache key segment for this filter.
    pub fn key_segment(&self) -> String {
        match self {
            ListFilter::All => "all".to_string(),
            ListFilter::Search(query) => format!("search:{query}"),
            ListFilter::Field { name, value } => format!("by:{name}={value}"),
        }
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 20;

    pub fn first() -> Self {
        Self {
            index: 0,
            size: Self::DEFAULT_SIZE,
        }
    }

    pub fn nth(index: u32) -> Self {
        Self {
            index,
            size: Self::DEFAULT_SIZE,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first()
    }
}

/// Remote data access for one entity kind.
#[async_trait]
pub trait RemoteFetcher<T: RemoteEntity>: Send + Sync {
    /// `Ok(None)` when the backend has no such entity.
    async fn fetch_entity(&self, id: &str) -> Result<Option<T>, RemoteError>;

    async fn fetch_list(&self, filter: &ListFilter, page: Page) -> Result<Vec<T>, RemoteError>;

    /// Apply a partial update and return the stored result.
    async fn mutate_entity(&self, id: &str, patch: Value) -> Result<T, RemoteError>;
}

/// Supplier of fresh reference data at startup.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn load_reference(&self) -> Result<ReferenceData, RemoteError>;
}

/// Fixed reference data, for offline startup and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticReference {
    data: ReferenceData,
}

impl StaticReference {
    pub fn new(data: ReferenceData) -> Self {
        Self { data }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceSource for StaticReference {
    async fn load_reference(&self) -> Result<ReferenceData, RemoteError> {
        Ok(self.data.clone())
    }
}
