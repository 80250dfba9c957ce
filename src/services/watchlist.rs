use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Counts, EntryKey, OwnerId, Page, Snapshot},
    services::{counts, pagination, pagination::PageRequest, toggle},
    store::{CollectionStore, MemoryStore},
};

const REVISION_BUMP_ATTEMPTS: u32 = 3;

/// Watchlist operations for every owner, backed by one collection store
///
/// Counts are cached in Redis when a cache is attached. Cached counts are keyed
/// by the owner's write revision, which every toggle and clear moves forward.
/// Owners whose revision could not be moved after a write bypass the cache
/// until a later bump succeeds.
#[derive(Clone)]
pub struct WatchlistService {
    store: Arc<dyn CollectionStore>,
    cache: Option<Cache>,
    unsynced: Arc<RwLock<HashSet<OwnerId>>>,
    counts_cache_ttl: u64,
    default_page_size: usize,
    max_page_size: usize,
}

impl WatchlistService {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Self {
        Self {
            store,
            cache: None,
            unsynced: Arc::new(RwLock::new(HashSet::new())),
            counts_cache_ttl: 60,
            default_page_size,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Service over a fresh in-memory store with the default page sizes
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), 20, 100)
    }

    pub fn with_cache(mut self, cache: Cache, ttl: u64) -> Self {
        self.cache = Some(cache);
        self.counts_cache_ttl = ttl;
        self
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Resolves a requested page size: absent means the default, zero is
    /// rejected and anything above the maximum is clamped
    pub fn resolve_page_size(&self, requested: Option<usize>) -> AppResult<usize> {
        match requested {
            None => Ok(self.default_page_size.clamp(1, self.max_page_size)),
            Some(0) => Err(AppError::InvalidInput(
                "page_size must be at least 1".to_string(),
            )),
            Some(size) => Ok(size.min(self.max_page_size)),
        }
    }

    pub async fn toggle(
        &self,
        owner: &OwnerId,
        key: EntryKey,
        snapshot: Snapshot,
    ) -> AppResult<bool> {
        let present = toggle::toggle_entry(self.store.as_ref(), owner, key, snapshot).await?;
        self.invalidate_counts(owner).await;
        Ok(present)
    }

    pub async fn clear(&self, owner: &OwnerId) -> AppResult<u64> {
        let removed = toggle::clear_entries(self.store.as_ref(), owner).await?;
        self.invalidate_counts(owner).await;
        Ok(removed)
    }

    pub async fn contains(&self, owner: &OwnerId, key: EntryKey) -> AppResult<bool> {
        self.store.contains(owner, key).await
    }

    pub async fn query(&self, owner: &OwnerId, request: &PageRequest) -> AppResult<Page> {
        pagination::query(self.store.as_ref(), owner, request).await
    }

    pub async fn counts(&self, owner: &OwnerId, search: Option<&str>) -> AppResult<Counts> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let Some(cache) = &self.cache else {
            return counts::count_entries(self.store.as_ref(), owner, search).await;
        };

        let behind = self.unsynced.read().await.contains(owner);
        if behind && !self.bump_revision(cache, owner).await {
            tracing::debug!(owner = %owner, "Revision still behind last write, counting uncached");
            return counts::count_entries(self.store.as_ref(), owner, search).await;
        }

        match self.cached_counts(cache, owner, search).await {
            Err(AppError::Cache(e)) => {
                tracing::warn!(owner = %owner, error = %e, "Counts cache unavailable, counting uncached");
                counts::count_entries(self.store.as_ref(), owner, search).await
            }
            result => result,
        }
    }

    async fn cached_counts(
        &self,
        cache: &Cache,
        owner: &OwnerId,
        search: Option<&str>,
    ) -> AppResult<Counts> {
        let key = CacheKey::Counts {
            owner: owner.clone(),
            revision: cache.revision(owner).await?,
            search: search.map(str::to_string),
        };

        cached!(cache, key, self.counts_cache_ttl, async {
            counts::count_entries(self.store.as_ref(), owner, search).await
        })
    }

    async fn invalidate_counts(&self, owner: &OwnerId) {
        let Some(cache) = &self.cache else {
            return;
        };

        for attempt in 1..=REVISION_BUMP_ATTEMPTS {
            if self.bump_revision(cache, owner).await {
                return;
            }
            if attempt < REVISION_BUMP_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(25 * u64::from(attempt))).await;
            }
        }

        tracing::warn!(owner = %owner, "Failed to invalidate cached counts, bypassing cache for owner");
        self.unsynced.write().await.insert(owner.clone());
    }

    /// Moves the owner's revision forward; true once cached counts no longer match
    async fn bump_revision(&self, cache: &Cache, owner: &OwnerId) -> bool {
        match cache.bump_revision(owner).await {
            Ok(_) => {
                self.unsynced.write().await.remove(owner);
                true
            }
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "Revision bump failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::test_support::owner;
    use tokio_test::assert_ok;

    #[test]
    fn test_resolve_page_size() {
        let service = WatchlistService::in_memory();
        assert_eq!(assert_ok!(service.resolve_page_size(None)), 20);
        assert_eq!(assert_ok!(service.resolve_page_size(Some(5))), 5);
        assert_eq!(assert_ok!(service.resolve_page_size(Some(5000))), 100);
        assert!(matches!(
            service.resolve_page_size(Some(0)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_counts_follow_toggles_without_cache() {
        let service = WatchlistService::in_memory();
        let alice = owner("alice");
        let key = EntryKey::new(Category::Movie, 155);

        service
            .toggle(&alice, key, Snapshot::titled("The Dark Knight"))
            .await
            .unwrap();
        let counts = service.counts(&alice, Some(" dark ")).await.unwrap();
        assert_eq!(counts.filtered.movie, 1);
        assert!(service.contains(&alice, key).await.unwrap());

        service
            .toggle(&alice, key, Snapshot::titled("The Dark Knight"))
            .await
            .unwrap();
        let counts = service.counts(&alice, None).await.unwrap();
        assert_eq!(counts.total.all, 0);
        assert!(!service.contains(&alice, key).await.unwrap());
    }

    #[tokio::test]
    async fn test_owners_do_not_see_each_other() {
        let service = WatchlistService::in_memory();
        let alice = owner("alice");
        let bob = owner("bob");

        service
            .toggle(&alice, EntryKey::new(Category::Tv, 1399), Snapshot::titled("Game of Thrones"))
            .await
            .unwrap();

        let page = service
            .query(
                &bob,
                &PageRequest {
                    page_size: 20,
                    ..PageRequest::default()
                },
            )
            .await
            .unwrap();
        assert!(page.page.is_empty());
        assert_eq!(service.clear(&bob).await.unwrap(), 0);
        assert_eq!(service.counts(&alice, None).await.unwrap().total.tv, 1);
    }

    /// Cache pointed at a port nothing listens on
    async fn unreachable_cache() -> Cache {
        let client = crate::db::create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _writer) = Cache::new(client).await;
        cache
    }

    #[tokio::test]
    async fn test_counts_fall_back_when_redis_is_unreachable() {
        let service = WatchlistService::in_memory().with_cache(unreachable_cache().await, 60);
        let alice = owner("alice");

        let counts = assert_ok!(service.counts(&alice, None).await);
        assert_eq!(counts, Counts::default());
    }

    #[tokio::test]
    async fn test_failed_invalidation_bypasses_cache_until_bumped() {
        let service = WatchlistService::in_memory().with_cache(unreachable_cache().await, 60);
        let alice = owner("alice");

        let present = assert_ok!(
            service
                .toggle(
                    &alice,
                    EntryKey::new(Category::Tv, 1399),
                    Snapshot::titled("Game of Thrones"),
                )
                .await
        );
        assert!(present);
        assert!(service.unsynced.read().await.contains(&alice));

        let counts = assert_ok!(service.counts(&alice, None).await);
        assert_eq!(counts.total.tv, 1);

        service
            .toggle(
                &alice,
                EntryKey::new(Category::Tv, 1399),
                Snapshot::titled("Game of Thrones"),
            )
            .await
            .unwrap();
        let counts = assert_ok!(service.counts(&alice, None).await);
        assert_eq!(counts.total.tv, 0);
        assert!(service.unsynced.read().await.contains(&alice));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cached_counts_are_invalidated_by_toggle() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = crate::db::create_redis_client(&redis_url).unwrap();
        let (cache, _handle) = Cache::new(client).await;
        let service = WatchlistService::in_memory().with_cache(cache, 60);
        let owner = OwnerId::parse(&format!("cache-test-{}", uuid::Uuid::new_v4())).unwrap();

        assert_eq!(service.counts(&owner, None).await.unwrap().total.all, 0);
        service
            .toggle(&owner, EntryKey::new(Category::Movie, 1), Snapshot::titled("Heat"))
            .await
            .unwrap();
        assert_eq!(service.counts(&owner, None).await.unwrap().total.all, 1);
    }
}
