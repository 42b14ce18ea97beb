//! In-memory storage backend.
//!
//! Stores users in a `HashMap` behind a `tokio::sync::RwLock`. Useful for tests
//! and local development where persistence is not required.

mod store;

pub use store::InMemoryUserStore;
