//! Read-through caching over the remote backend.

use std::sync::Arc;

use commons_core::{ListFilter, Page, RemoteEntity, RemoteError, RemoteFetcher};
use commons_storage::{CacheTier, ExpiringCache};
use serde_json::Value;

/// Wraps remote calls with cache population and invalidation.
///
/// Key layout, per entity kind:
///
/// ```text
/// {kind}:id:{id}                 single entity      long tier
/// {kind}:all                     full listing       medium tier
/// {kind}:by:{field}={value}      filtered listing   medium tier
/// {kind}:search:{query}          search results     short tier
/// ```
///
/// Listings past the first page append `:page={n}`.
#[derive(Clone)]
pub struct CachedRemote {
    cache: Arc<ExpiringCache>,
}

impl CachedRemote {
    pub fn new(cache: Arc<ExpiringCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    pub fn entity_key<T: RemoteEntity>(id: &str) -> String {
        format!("{}:id:{id}", T::KIND)
    }

    pub fn list_key<T: RemoteEntity>(filter: &ListFilter, page: Page) -> String {
        let base = format!("{}:{}", T::KIND, filter.key_segment());
        if page.index == 0 {
            base
        } else {
            format!("{base}:page={}", page.index)
        }
    }

    /// Cached single-entity read. A backend "not found" is not cached.
    pub async fn fetch_entity<T, F>(&self, fetcher: &F, id: &str) -> Result<Option<T>, RemoteError>
    where
        T: RemoteEntity,
        F: RemoteFetcher<T> + ?Sized,
    {
        let key = Self::entity_key::<T>(id);
        if let Some(hit) = self.cache.get::<T>(&key) {
            return Ok(Some(hit));
        }
        tracing::debug!(target: "commons::remote", key = %key, "fetching entity");
        let fetched = fetcher.fetch_entity(id).await?;
        if let Some(entity) = &fetched {
            self.cache.set_tiered(key, entity.clone(), CacheTier::Long);
        }
        Ok(fetched)
    }

    /// Cached listing. Search results use the short tier.
    pub async fn fetch_list<T, F>(
        &self,
        fetcher: &F,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<T>, RemoteError>
    where
        T: RemoteEntity,
        F: RemoteFetcher<T> + ?Sized,
    {
        let key = Self::list_key::<T>(filter, page);
        if let Some(hit) = self.cache.get::<Vec<T>>(&key) {
            return Ok(hit);
        }
        tracing::debug!(target: "commons::remote", key = %key, "fetching list");
        let items = fetcher.fetch_list(filter, page).await?;
        let tier = if filter.is_search() {
            CacheTier::Short
        } else {
            CacheTier::Medium
        };
        self.cache.set_tiered(key, items.clone(), tier);
        Ok(items)
    }

    /// Forward a mutation, then drop every cached read of that kind and seed
    /// the updated entity.
    pub async fn mutate_entity<T, F>(&self, fetcher: &F, id: &str, patch: Value) -> Result<T, RemoteError>
    where
        T: RemoteEntity,
        F: RemoteFetcher<T> + ?Sized,
    {
        let updated = fetcher.mutate_entity(id, patch).await?;
        let dropped = self.invalidate_kind::<T>();
        tracing::debug!(target: "commons::remote", kind = T::KIND, id, dropped, "mutation invalidated cache");
        self.cache
            .set_tiered(Self::entity_key::<T>(updated.entity_id()), updated.clone(), CacheTier::Long);
        Ok(updated)
    }

    /// Drop one entity's cached read and every cached listing of its kind.
    pub fn invalidate_entity<T: RemoteEntity>(&self, id: &str) -> usize {
        let mut dropped = usize::from(self.cache.invalidate(&Self::entity_key::<T>(id)));
        for listing in ["all", "by:", "search:"] {
            dropped += self
                .cache
                .invalidate_pattern(&format!("{}:{listing}*", T::KIND));
        }
        dropped
    }

    /// Drop every cached read for entity kind `T`.
    pub fn invalidate_kind<T: RemoteEntity>(&self) -> usize {
        self.cache.invalidate_pattern(&format!("{}:*", T::KIND))
    }
}

impl std::fmt::Debug for CachedRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedRemote")
            .field("entries", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commons_core::{CacheSettings, CommunityEvent, ManualClock, Ngo};
    use commons_test_utils::{sample_reference, ScriptedFetcher};

    fn remote() -> (CachedRemote, ManualClock) {
        let clock = ManualClock::starting_now();
        let cache = ExpiringCache::new(&CacheSettings::default(), Arc::new(clock.clone()));
        (CachedRemote::new(Arc::new(cache)), clock)
    }

    #[test]
    fn test_keys() {
        assert_eq!(CachedRemote::entity_key::<Ngo>("n-1"), "ngos:id:n-1");
        assert_eq!(CachedRemote::list_key::<Ngo>(&ListFilter::All, Page::first()), "ngos:all");
        assert_eq!(
            CachedRemote::list_key::<Ngo>(&ListFilter::Search("a".into()), Page::first()),
            "ngos:search:a"
        );
        assert_eq!(
            CachedRemote::list_key::<CommunityEvent>(&ListFilter::All, Page::nth(2)),
            "events:all:page=2"
        );
    }

    #[tokio::test]
    async fn test_entity_read_is_cached() {
        let (remote, _) = remote();
        let fetcher = ScriptedFetcher::new(sample_reference().ngos);

        let first: Option<Ngo> = remote.fetch_entity(&fetcher, "n-1").await.unwrap();
        let second: Option<Ngo> = remote.fetch_entity(&fetcher, "n-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.entity_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_entity_is_not_cached() {
        let (remote, _) = remote();
        let fetcher = ScriptedFetcher::<Ngo>::new(Vec::new());
        for _ in 0..2 {
            let missing: Option<Ngo> = remote.fetch_entity(&fetcher, "n-9").await.unwrap();
            assert_eq!(missing, None);
        }
        assert_eq!(fetcher.entity_calls(), 2);
    }

    #[tokio::test]
    async fn test_search_expires_before_listing() {
        let (remote, clock) = remote();
        let fetcher = ScriptedFetcher::new(sample_reference().ngos);
        let search = ListFilter::Search("n-".into());

        let _: Vec<Ngo> = remote.fetch_list(&fetcher, &ListFilter::All, Page::first()).await.unwrap();
        let _: Vec<Ngo> = remote.fetch_list(&fetcher, &search, Page::first()).await.unwrap();
        assert_eq!(fetcher.list_calls(), 2);

        // Past the short tier, inside the medium tier.
        clock.advance_ms(31_000);
        let _: Vec<Ngo> = remote.fetch_list(&fetcher, &ListFilter::All, Page::first()).await.unwrap();
        let _: Vec<Ngo> = remote.fetch_list(&fetcher, &search, Page::first()).await.unwrap();
        assert_eq!(fetcher.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_kind_and_seeds_entity() {
        let (remote, _) = remote();
        let ngos = ScriptedFetcher::new(sample_reference().ngos);
        let events = ScriptedFetcher::new(sample_reference().events);

        let _: Vec<Ngo> = remote.fetch_list(&ngos, &ListFilter::All, Page::first()).await.unwrap();
        let _: Vec<CommunityEvent> = remote.fetch_list(&events, &ListFilter::All, Page::first()).await.unwrap();

        let updated: Ngo = remote
            .mutate_entity(&ngos, "n-1", serde_json::json!({ "volunteer_count": 12 }))
            .await
            .unwrap();
        assert_eq!(updated.volunteer_count, 12);

        let cached: Option<Ngo> = remote.fetch_entity(&ngos, "n-1").await.unwrap();
        assert_eq!(cached.map(|n| n.volunteer_count), Some(12));
        assert_eq!(ngos.entity_calls(), 0, "served from the seeded entry");

        let _: Vec<Ngo> = remote.fetch_list(&ngos, &ListFilter::All, Page::first()).await.unwrap();
        assert_eq!(ngos.list_calls(), 2, "listing was invalidated");
        let _: Vec<CommunityEvent> = remote.fetch_list(&events, &ListFilter::All, Page::first()).await.unwrap();
        assert_eq!(events.list_calls(), 1, "other kinds untouched");
    }

    #[tokio::test]
    async fn test_remote_failure_propagates_and_caches_nothing() {
        let (remote, _) = remote();
        let fetcher = ScriptedFetcher::new(sample_reference().ngos);
        fetcher.fail_requests(true);
        let result: Result<Vec<Ngo>, _> = remote.fetch_list(&fetcher, &ListFilter::All, Page::first()).await;
        assert!(result.is_err());
        assert!(remote.cache().is_empty());
    }
}
