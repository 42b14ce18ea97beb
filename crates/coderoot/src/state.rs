//! Application state.
//!
//! Shared by every request handler. Holds the cached user repository behind a
//! trait object plus direct handles to the backends for health probes. The
//! concrete backends are selected via feature flags.

use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use coderoot_core::cache::Cache;
use coderoot_core::storage::{CallScope, Result as RepositoryResult, UserRepository, UserStore};

use crate::config::Config;
use crate::storage::cached::CachedUserRepository;

// ============================================================================
// Compile-time feature validation
// ============================================================================

#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!("Cannot enable both 'sqlite' and 'inmemory' storage features");

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!("Must enable exactly one storage feature: 'inmemory' or 'sqlite'");

/// Connection attempts made against Redis at startup.
#[cfg(feature = "redis")]
const REDIS_CONNECT_ATTEMPTS: u32 = 3;

/// Pause between Redis connection attempts.
#[cfg(feature = "redis")]
const REDIS_CONNECT_DELAY: Duration = Duration::from_secs(2);

/// Request and server-error counts since startup, reported by `/metrics`.
#[derive(Debug, Default)]
pub struct RequestCounters {
    requests: AtomicU64,
    errors: AtomicU64,
}

impl RequestCounters {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Shared application state.
///
/// Cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    /// User repository (cached, wraps the document store).
    pub user_repo: Arc<dyn UserRepository>,
    /// Document store, for liveness probes only.
    pub store: Arc<dyn UserStore>,
    /// Cache backend, for liveness probes only.
    pub cache: Arc<dyn Cache>,
    /// Configuration computed at startup.
    pub config: Arc<Config>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
    /// Served requests and 5xx responses.
    pub counters: Arc<RequestCounters>,
    /// Shutdown signal sender for in-flight repository calls.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Wires the cache-aside repository over the given backends.
    fn build<S, C>(store: Arc<S>, cache: Arc<C>, config: Config) -> Self
    where
        S: UserStore + 'static,
        C: Cache + 'static,
    {
        let user_repo = CachedUserRepository::new(store.clone(), cache.clone(), config.cache_ttl())
            .with_timeouts(config.store_timeout(), config.cache_timeout());
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            user_repo: Arc::new(user_repo),
            store,
            cache,
            config: Arc::new(config),
            started_at: Instant::now(),
            counters: Arc::new(RequestCounters::default()),
            shutdown_tx,
        }
    }

    /// Creates AppState with the backends selected at compile time.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let store = open_store(&config).await?;
        let cache = open_cache(&config).await?;
        Ok(Self::build(store, cache, config))
    }

    /// A call scope bounded by the request timeout and the shutdown signal.
    pub fn call_scope(&self) -> CallScope {
        CallScope::new(self.config.request_timeout()).with_shutdown(self.subscribe_shutdown())
    }

    /// Runs a repository call inside a fresh [`CallScope`].
    pub async fn scoped<T>(&self, call: impl Future<Output = RepositoryResult<T>>) -> RepositoryResult<T> {
        self.call_scope().run(call).await
    }

    /// Time since the state was built.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Subscribe to shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal all in-flight calls to cancel.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// ============================================================================
// Backend factories
// ============================================================================

#[cfg(feature = "sqlite")]
async fn open_store(
    config: &Config,
) -> Result<Arc<crate::storage::sqlite::SqliteUserStore>, anyhow::Error> {
    let store = crate::storage::sqlite::SqliteUserStore::new(&config.sqlite_path).await?;
    tracing::info!(path = %config.sqlite_path, "Opened SQLite user store");
    Ok(Arc::new(store))
}

#[cfg(feature = "inmemory")]
async fn open_store(
    _config: &Config,
) -> Result<Arc<crate::storage::inmemory::InMemoryUserStore>, anyhow::Error> {
    tracing::warn!("Using in-memory user store, data will not survive a restart");
    Ok(Arc::new(crate::storage::inmemory::InMemoryUserStore::new()))
}

#[cfg(feature = "memory")]
async fn open_cache(config: &Config) -> Result<Arc<crate::cache::memory::MemoryCache>, anyhow::Error> {
    tracing::info!(max_entries = config.cache_max_entries, "Using in-memory cache");
    Ok(Arc::new(crate::cache::memory::MemoryCache::new(
        config.cache_max_entries,
    )))
}

#[cfg(feature = "redis")]
async fn open_cache(
    config: &Config,
) -> Result<Arc<crate::cache::redis_impl::RedisCache>, anyhow::Error> {
    let cache = crate::cache::redis_impl::RedisCache::connect_with_retry(
        &config.redis_url,
        REDIS_CONNECT_ATTEMPTS,
        REDIS_CONNECT_DELAY,
    )
    .await?;
    Ok(Arc::new(cache))
}

// ============================================================================
// Test support - provides Default implementation for unit tests
// ============================================================================
