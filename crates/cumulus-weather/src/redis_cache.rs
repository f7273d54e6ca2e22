//! Redis adapter for the response cache.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use crate::cache::WeatherCache;
use crate::error::CacheError;

/// Shared Redis connection; clones reuse the same multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Open a managed connection to the server at `url` (`redis://host:port/db`).
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::debug!("Connected to Redis response cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl WeatherCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // PSETEX rejects a zero TTL
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = conn.pset_ex(key, value, millis).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_backend_error() {
        let result = RedisCache::connect("not a redis url").await;
        assert!(matches!(result, Err(CacheError::Backend(_))));
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -p cumulus-weather -- --ignored (needs a local Redis)
    async fn test_round_trip_against_local_redis() {
        let cache = match RedisCache::connect("redis://127.0.0.1:6379").await {
            Ok(c) => c,
            Err(e) => panic!("Redis not reachable: {}", e),
        };
        let key = "cumulus:test:lat=1&lon=2&units=metric";
        let set = cache.set(key, "{}", Duration::from_secs(5)).await;
        assert!(set.is_ok());
        let got = cache.get(key).await;
        assert!(matches!(got, Ok(Some(ref v)) if v == "{}"));
    }
}
