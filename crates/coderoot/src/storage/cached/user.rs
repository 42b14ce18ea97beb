//! Cached user repository decorator.
//!
//! Wraps a `UserStore` implementation with the cache-aside pattern.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use coderoot_core::cache::{
    deserialize_user, serialize_user, user_key, Cache, CacheError, Result as CacheResult,
};
use coderoot_core::storage::{CallScope, Pagination, Result, UserRepository, UserStore};
use coderoot_core::user::{prepare_new_user, ActiveUsersPage, User, UserId, UserStats, UserUpdate};

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(1);

/// Cached user repository decorator.
///
/// Implements the cache-aside pattern:
/// - **Reads** by user ID check the cache first; on a miss the store is
///   queried and the cache populated.
/// - **Writes** go to the store; updates and deletes then invalidate the
///   cached copy instead of writing through.
///
/// Cache failures never fail an operation. They are logged at `warn` and the
/// call proceeds against the store alone. Every store call is bounded by
/// `store_timeout`, every cache call by `cache_timeout`.
///
/// # Type Parameters
///
/// * `S` - The underlying store implementation
/// * `C` - The cache implementation
pub struct CachedUserRepository<S, C>
where
    S: UserStore,
    C: Cache,
{
    store: Arc<S>,
    cache: Arc<C>,
    ttl: Duration,
    store_timeout: Duration,
    cache_timeout: Duration,
}

impl<S, C> CachedUserRepository<S, C>
where
    S: UserStore,
    C: Cache,
{
    /// Creates a new cached user repository.
    ///
    /// # Arguments
    ///
    /// * `store` - The document store, source of truth
    /// * `cache` - The cache implementation
    /// * `ttl` - Time-to-live for cached users
    pub fn new(store: Arc<S>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            store,
            cache,
            ttl,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    /// Overrides the per-call timeouts.
    pub fn with_timeouts(mut self, store_timeout: Duration, cache_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self.cache_timeout = cache_timeout;
        self
    }

    async fn store_call<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        CallScope::new(self.store_timeout).run(call).await
    }

    async fn cache_call<T>(&self, call: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        tokio::time::timeout(self.cache_timeout, call)
            .await
            .map_err(|_| CacheError::Timeout(self.cache_timeout))?
    }

    /// Looks the user up in the cache. Any failure counts as a miss.
    async fn cached_user(&self, user_id: UserId) -> Option<User> {
        let key = user_key(user_id);
        match self.cache_call(self.cache.get(&key)).await {
            Ok(Some(bytes)) => match deserialize_user(&bytes) {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "Cache user deserialization failed");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Cache degraded, reading from store");
                None
            }
        }
    }

    async fn cache_user(&self, user: &User) {
        let bytes = match serialize_user(user) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(user_id = user.user_id, error = %err, "Failed to serialize user for cache");
                return;
            }
        };

        let key = user_key(user.user_id);
        if let Err(err) = self
            .cache_call(self.cache.set(&key, &bytes, Some(self.ttl)))
            .await
        {
            tracing::warn!(user_id = user.user_id, error = %err, "Failed to cache user");
        }
    }

    async fn invalidate(&self, user_id: UserId) {
        let key = user_key(user_id);
        if let Err(err) = self.cache_call(self.cache.delete(&key)).await {
            tracing::warn!(user_id, error = %err, "Failed to invalidate user cache");
        }
    }
}

#[async_trait]
impl<S, C> UserRepository for CachedUserRepository<S, C>
where
    S: UserStore + 'static,
    C: Cache + 'static,
{
    async fn create(&self, user: &mut User) -> Result<()> {
        prepare_new_user(user, Utc::now());

        // 1. Persist to storage
        let record_id = self.store_call(self.store.insert_user(user)).await?;
        user.record_id = Some(record_id);

        // 2. Populate cache immediately
        self.cache_user(user).await;

        tracing::info!(
            user_id = user.user_id,
            record_id,
            referral_code = user.referral_code.as_deref().unwrap_or_default(),
            "User created"
        );
        Ok(())
    }

    async fn get_by_user_id(&self, user_id: UserId) -> Result<Option<User>> {
        if let Some(user) = self.cached_user(user_id).await {
            tracing::trace!(user_id, "Cache hit for user");
            return Ok(Some(user));
        }

        tracing::trace!(user_id, "Cache miss for user");
        let user = self
            .store_call(self.store.find_by_user_id(user_id))
            .await?;

        if let Some(ref u) = user {
            self.cache_user(u).await;
        }

        Ok(user)
    }

    async fn get_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        self.store_call(self.store.find_by_referral_code(code))
            .await
    }

    async fn update(&self, user_id: UserId, update: &UserUpdate) -> Result<()> {
        // 1. Persist to storage
        self.store_call(self.store.update_fields(user_id, update, Utc::now()))
            .await?;

        // 2. Invalidate cache (will be repopulated on next read)
        self.invalidate(user_id).await;

        tracing::debug!(user_id, "User updated");
        Ok(())
    }

    async fn update_last_activity(&self, user_id: UserId) -> Result<()> {
        self.store_call(self.store.set_last_activity(user_id, Utc::now()))
            .await
    }

    async fn delete(&self, user_id: UserId) -> Result<()> {
        // Soft delete: the document stays, only the active flag flips.
        self.store_call(
            self.store
                .update_fields(user_id, &UserUpdate::deactivate(), Utc::now()),
        )
        .await?;

        self.invalidate(user_id).await;

        tracing::info!(user_id, "User deactivated");
        Ok(())
    }

    async fn get_active_users(&self, pagination: Pagination) -> Result<ActiveUsersPage> {
        let total = self.store_call(self.store.count_active()).await?;
        let users = self
            .store_call(self.store.find_active(pagination))
            .await?;

        Ok(ActiveUsersPage {
            users,
            total,
            page: pagination.page,
            limit: pagination.limit,
        })
    }

    async fn get_user_stats(&self) -> Result<UserStats> {
        self.store_call(self.store.aggregate_stats()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};
    use tokio::sync::RwLock;
    use tracing_test::traced_test;

    use coderoot_core::storage::RepositoryError;
    use coderoot_core::user::{RecordId, REFERRAL_CODE_LEN};

    use crate::storage::inmemory::InMemoryUserStore;

    const TTL: Duration = Duration::from_secs(3600);

    // Store that counts lookups and can be made slow.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryUserStore,
        find_calls: AtomicUsize,
        latency: Option<Duration>,
        // Applied after the insert lands, like a backend that commits
        // before it answers.
        insert_latency: Option<Duration>,
    }

    impl CountingStore {
        fn slow(latency: Duration) -> Self {
            Self {
                latency: Some(latency),
                ..Self::default()
            }
        }

        fn find_calls(&self) -> usize {
            self.find_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserStore for CountingStore {
        async fn insert_user(&self, user: &User) -> Result<RecordId> {
            let record_id = self.inner.insert_user(user).await?;
            if let Some(latency) = self.insert_latency {
                tokio::time::sleep(latency).await;
            }
            Ok(record_id)
        }

        async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<User>> {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.inner.find_by_user_id(user_id).await
        }

        async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>> {
            self.inner.find_by_referral_code(code).await
        }

        async fn update_fields(
            &self,
            user_id: UserId,
            update: &UserUpdate,
            updated_at: DateTime<Utc>,
        ) -> Result<()> {
            self.inner.update_fields(user_id, update, updated_at).await
        }

        async fn set_last_activity(&self, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
            self.inner.set_last_activity(user_id, at).await
        }

        async fn count_active(&self) -> Result<u64> {
            self.inner.count_active().await
        }

        async fn find_active(&self, pagination: Pagination) -> Result<Vec<User>> {
            self.inner.find_active(pagination).await
        }

        async fn aggregate_stats(&self) -> Result<UserStats> {
            self.inner.aggregate_stats().await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    // Mock cache; `unreachable` makes every call fail like a dead Redis.
    #[derive(Default)]
    struct MockCache {
        store: RwLock<HashMap<String, Vec<u8>>>,
        unreachable: bool,
        latency: Option<Duration>,
    }

    impl MockCache {
        fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::default()
            }
        }

        fn slow(latency: Duration) -> Self {
            Self {
                latency: Some(latency),
                ..Self::default()
            }
        }

        async fn check(&self) -> CacheResult<()> {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            if self.unreachable {
                return Err(CacheError::ConnectionFailed("connection refused".to_string()));
            }
            Ok(())
        }

        async fn contains(&self, user_id: UserId) -> bool {
            self.store.read().await.contains_key(&user_key(user_id))
        }
    }

    #[async_trait]
    impl Cache for MockCache {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.check().await?;
            Ok(self.store.read().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
            self.check().await?;
            self.store
                .write()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            self.check().await?;
            self.store.write().await.remove(key);
            Ok(())
        }

        async fn ping(&self) -> CacheResult<()> {
            self.check().await
        }
    }

    fn repo_with(
        store: CountingStore,
        cache: MockCache,
    ) -> (
        CachedUserRepository<CountingStore, MockCache>,
        Arc<CountingStore>,
        Arc<MockCache>,
    ) {
        let store = Arc::new(store);
        let cache = Arc::new(cache);
        let repo = CachedUserRepository::new(store.clone(), cache.clone(), TTL);
        (repo, store, cache)
    }

    fn repo() -> (
        CachedUserRepository<CountingStore, MockCache>,
        Arc<CountingStore>,
        Arc<MockCache>,
    ) {
        repo_with(CountingStore::default(), MockCache::default())
    }

    async fn create_user(repo: &CachedUserRepository<CountingStore, MockCache>, id: UserId) -> User {
        let mut user = User::new(id, format!("User {id}"), "fa");
        repo.create(&mut user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_create_then_get_returns_input() {
        let (repo, _, _) = repo();
        let mut user = User::new(1, "Ada", "fa").with_username("ada");
        user.is_active = false;

        repo.create(&mut user).await.unwrap();
        let found = repo.get_by_user_id(1).await.unwrap().unwrap();

        assert_eq!(found, user);
        assert!(found.is_active);
        assert!(found.record_id.is_some());
        assert_eq!(
            found.referral_code.as_ref().map(String::len),
            Some(REFERRAL_CODE_LEN)
        );
        assert_eq!(found.created_at, found.updated_at);
        assert_eq!(found.created_at, found.last_activity);
    }

    #[tokio::test]
    async fn test_create_populates_cache() {
        let (repo, store, cache) = repo();

        create_user(&repo, 1).await;

        assert!(cache.contains(1).await);
        repo.get_by_user_id(1).await.unwrap();
        assert_eq!(store.find_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts_and_keeps_record() {
        let (repo, _, _) = repo();
        let original = create_user(&repo, 1).await;

        let mut duplicate = User::new(1, "Mallory", "en");
        let err = repo.create(&mut duplicate).await.unwrap_err();

        assert!(err.is_conflict());
        let found = repo.get_by_user_id(1).await.unwrap().unwrap();
        assert_eq!(found, original);
    }

    #[tokio::test]
    async fn test_get_cache_miss_populates_cache() {
        let (repo, store, cache) = repo();
        let mut user = User::new(1, "Ada", "fa");
        prepare_new_user(&mut user, Utc::now());
        store.insert_user(&user).await.unwrap();

        let first = repo.get_by_user_id(1).await.unwrap();
        assert_eq!(first.map(|u| u.user_id), Some(1));
        assert_eq!(store.find_calls(), 1);
        assert!(cache.contains(1).await);

        // Second read is served from the cache.
        repo.get_by_user_id(1).await.unwrap();
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_user_returns_none() {
        let (repo, _, cache) = repo();

        assert!(repo.get_by_user_id(404).await.unwrap().is_none());
        assert!(!cache.contains(404).await);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_falls_back_to_store() {
        let (repo, store, cache) = repo();
        create_user(&repo, 1).await;
        cache.set(&user_key(1), b"not json", None).await.unwrap();

        let found = repo.get_by_user_id(1).await.unwrap();

        assert_eq!(found.map(|u| u.user_id), Some(1));
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_by_referral_code_bypasses_cache() {
        let (repo, _, _) = repo();
        let user = create_user(&repo, 1).await;
        let code = user.referral_code.unwrap();

        let found = repo.get_by_referral_code(&code).await.unwrap();

        assert_eq!(found.map(|u| u.user_id), Some(1));
        assert!(repo.get_by_referral_code("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_with_warm_cache() {
        let (repo, _, cache) = repo();
        let created = create_user(&repo, 1).await;
        repo.get_by_user_id(1).await.unwrap();
        assert!(cache.contains(1).await);
        tokio::time::sleep(Duration::from_millis(5)).await;

        repo.update(1, &UserUpdate::language("en")).await.unwrap();

        assert!(!cache.contains(1).await);
        let found = repo.get_by_user_id(1).await.unwrap().unwrap();
        assert_eq!(found.language, "en");
        assert!(found.updated_at > created.updated_at);
        assert_eq!(found.referral_code, created.referral_code);
    }

    #[tokio::test]
    async fn test_update_with_cold_cache() {
        let (repo, _, cache) = repo();
        let created = create_user(&repo, 1).await;
        cache.delete(&user_key(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        repo.update(1, &UserUpdate::language("en")).await.unwrap();

        let found = repo.get_by_user_id(1).await.unwrap().unwrap();
        assert_eq!(found.language, "en");
        assert!(found.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_user_fails() {
        let (repo, _, _) = repo();

        let err = repo
            .update(404, &UserUpdate::language("en"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_last_activity_only_touches_activity() {
        let (repo, store, cache) = repo();
        let created = create_user(&repo, 1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        repo.update_last_activity(1).await.unwrap();

        // The cached copy is left alone.
        assert!(cache.contains(1).await);
        let stored = store.inner.find_by_user_id(1).await.unwrap().unwrap();
        assert!(stored.last_activity > created.last_activity);
        assert_eq!(stored.updated_at, created.updated_at);
        assert_eq!(
            User {
                last_activity: created.last_activity,
                ..stored
            },
            created
        );
    }

    #[tokio::test]
    async fn test_update_last_activity_unknown_user_fails() {
        let (repo, _, _) = repo();

        assert!(repo.update_last_activity(404).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let (repo, _, cache) = repo();
        let created = create_user(&repo, 1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        repo.delete(1).await.unwrap();

        assert!(!cache.contains(1).await);
        let found = repo.get_by_user_id(1).await.unwrap().unwrap();
        assert!(!found.is_active);
        assert!(found.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_get_active_users_first_page() {
        let (repo, _, _) = repo();
        for id in 1..=3 {
            create_user(&repo, id).await;
        }

        let page = repo
            .get_active_users(Pagination::new(1, 10).unwrap())
            .await
            .unwrap();

        assert!(page.users.len() <= 10);
        assert!(page.total >= page.users.len() as u64);
        assert_eq!(page.total, 3);
        assert_eq!((page.page, page.limit), (1, 10));
    }

    #[tokio::test]
    async fn test_get_active_users_second_page() {
        let (repo, _, _) = repo();
        for id in 1..=25 {
            create_user(&repo, id).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let page = repo
            .get_active_users(Pagination::new(2, 10).unwrap())
            .await
            .unwrap();

        let ids: Vec<UserId> = page.users.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, (6..=15).rev().collect::<Vec<_>>());
        assert_eq!(page.total, 25);
    }

    #[tokio::test]
    async fn test_get_active_users_excludes_deleted() {
        let (repo, _, _) = repo();
        create_user(&repo, 1).await;
        create_user(&repo, 2).await;
        repo.delete(2).await.unwrap();

        let page = repo
            .get_active_users(Pagination::new(1, 10).unwrap())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.users[0].user_id, 1);
    }

    #[tokio::test]
    async fn test_get_user_stats() {
        let (repo, _, _) = repo();
        assert_eq!(repo.get_user_stats().await.unwrap(), UserStats::default());

        create_user(&repo, 1).await;
        create_user(&repo, 2).await;
        repo.update(2, &UserUpdate {
            is_premium: Some(true),
            ..UserUpdate::default()
        })
        .await
        .unwrap();
        repo.delete(1).await.unwrap();

        assert_eq!(
            repo.get_user_stats().await.unwrap(),
            UserStats {
                total: 2,
                active: 1,
                premium: 1
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_cache_degrades_gracefully() {
        let (repo, store, _) = repo_with(CountingStore::default(), MockCache::unreachable());

        let mut user = User::new(1, "Ada", "fa");
        repo.create(&mut user).await.unwrap();
        let found = repo.get_by_user_id(1).await.unwrap();
        repo.update(1, &UserUpdate::language("en")).await.unwrap();
        repo.delete(1).await.unwrap();

        assert_eq!(found, Some(user));
        assert_eq!(store.find_calls(), 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_unreachable_cache_logs_degraded_read() {
        let (repo, store, _) = repo_with(CountingStore::default(), MockCache::unreachable());
        let mut user = User::new(1, "Ada", "fa");
        prepare_new_user(&mut user, Utc::now());
        store.insert_user(&user).await.unwrap();

        let found = repo.get_by_user_id(1).await.unwrap();

        assert_eq!(found.map(|u| u.user_id), Some(1));
        assert!(logs_contain("Cache degraded, reading from store"));
        assert!(logs_contain("Failed to cache user"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_unreachable_cache_logs_failed_invalidation() {
        let (repo, store, _) = repo_with(CountingStore::default(), MockCache::unreachable());
        let mut user = User::new(1, "Ada", "fa");
        prepare_new_user(&mut user, Utc::now());
        store.insert_user(&user).await.unwrap();

        repo.update(1, &UserUpdate::language("en")).await.unwrap();
        assert!(logs_contain("Failed to invalidate user cache"));
        assert!(logs_contain("User updated"));

        repo.delete(1).await.unwrap();
        assert!(logs_contain("User deactivated"));
    }

    #[tokio::test]
    async fn test_slow_cache_times_out_and_store_answers() {
        let (repo, store, _) = repo_with(
            CountingStore::default(),
            MockCache::slow(Duration::from_secs(5)),
        );
        let repo = repo.with_timeouts(DEFAULT_STORE_TIMEOUT, Duration::from_millis(20));
        let mut user = User::new(1, "Ada", "fa");
        prepare_new_user(&mut user, Utc::now());
        store.insert_user(&user).await.unwrap();

        let found = repo.get_by_user_id(1).await.unwrap();

        assert_eq!(found.map(|u| u.user_id), Some(1));
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_create_is_visible_on_next_read() {
        let store = CountingStore {
            insert_latency: Some(Duration::from_secs(5)),
            ..CountingStore::default()
        };
        let (repo, _, cache) = repo_with(store, MockCache::default());
        let repo = repo.with_timeouts(Duration::from_millis(20), DEFAULT_CACHE_TIMEOUT);
        let mut user = User::new(1, "Ada", "fa");

        let err = repo.create(&mut user).await.unwrap_err();

        assert_eq!(err, RepositoryError::Timeout(Duration::from_millis(20)));
        assert!(!cache.contains(1).await);
        let found = repo.get_by_user_id(1).await.unwrap();
        assert_eq!(found.map(|u| u.user_id), Some(1));
        assert!(cache.contains(1).await);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let (repo, _, _) = repo_with(
            CountingStore::slow(Duration::from_secs(5)),
            MockCache::default(),
        );
        let repo = repo.with_timeouts(Duration::from_millis(20), DEFAULT_CACHE_TIMEOUT);

        let err = repo.get_by_user_id(1).await.unwrap_err();

        assert_eq!(err, RepositoryError::Timeout(Duration::from_millis(20)));
    }
}
