//! Cached repository decorators.
//!
//! The decorator wraps a `UserStore` with the cache-aside protocol:
//!
//! - **Reads**: Check cache first, on miss fetch from the store and populate cache
//! - **Writes**: Persist to the store, then invalidate the cached copy
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(SqliteUserStore::new("coderoot.db").await?);
//! let cache = Arc::new(MemoryCache::new(10_000));
//!
//! let repo = CachedUserRepository::new(store, cache, Duration::from_secs(3600));
//! ```

mod user;

pub use user::CachedUserRepository;
