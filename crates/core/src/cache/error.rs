use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during cache operations.
///
/// These never reach repository callers: the cache-aside layer logs them and
/// falls back to the document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
