//! Redis cache implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use coderoot_core::cache::{Cache, CacheError, Result};

use super::error::map_redis_error;

/// Redis cache backend using a multiplexed connection manager.
///
/// The manager reconnects on its own after a dropped connection, so a single
/// instance is shared by every request.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        let cache = Self { conn };
        cache.ping().await?;
        Ok(cache)
    }

    /// Connects, retrying up to `attempts` times with `delay` between tries.
    ///
    /// Returns the error of the last attempt.
    pub async fn connect_with_retry(url: &str, attempts: u32, delay: Duration) -> Result<Self> {
        let mut last_error = CacheError::ConnectionFailed("no connection attempt made".into());

        for attempt in 1..=attempts {
            match Self::new(url).await {
                Ok(cache) => {
                    tracing::info!(attempt, "Connected to Redis");
                    return Ok(cache);
                }
                Err(err) => {
                    tracing::warn!(attempt, attempts, error = %err, "Redis connection attempt failed");
                    last_error = err;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}
