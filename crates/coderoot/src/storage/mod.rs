//! Storage backend implementations.
//!
//! This module provides concrete implementations of the `UserStore` trait
//! defined in `coderoot_core::storage`, plus the cache-aside decorator that
//! turns a store and a cache into a `UserRepository`. The store used at
//! runtime is selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `sqlite` (default): SQLite storage backend using `rusqlite` and `tokio-rusqlite`
//! - `inmemory`: In-process storage backend, data is lost on restart
//!
//! These features are mutually exclusive - only one storage backend can be
//! enabled at a time. The in-memory store is always compiled for tests.
//!
//! # Examples
//!
//! Build with SQLite (default):
//! ```bash
//! cargo build -p coderoot
//! ```
//!
//! Build with in-memory storage and Redis:
//! ```bash
//! cargo build -p coderoot --no-default-features --features inmemory,redis
//! ```

pub mod cached;

#[cfg(any(test, feature = "inmemory"))]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
