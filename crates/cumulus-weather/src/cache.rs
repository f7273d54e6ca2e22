//! Response cache port and the in-process adapter.
//!
//! Entries are raw provider response text keyed by the canonical query key.
//! They are written once and expire after their TTL; there are no partial
//! updates.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CacheError;

/// Lifetime of a cached weather response.
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Key-value store holding raw responses with a per-entry TTL.
#[async_trait]
pub trait WeatherCache: Send + Sync {
    /// Read the value under `key`; `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Time source for expiry checks.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

#[derive(Debug)]
struct Entry {
    value: String,
    /// `None` when the TTL overflows `Instant`
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process cache used when no Redis URL is configured, and in tests.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = entries.get(key).map(|e| e.is_expired(now));
        match expired {
            Some(true) => {
                tracing::trace!(key, "Expired cache entry removed");
                entries.remove(key);
                Ok(None)
            }
            Some(false) => Ok(entries.get(key).map(|e| e.value.clone())),
            None => Ok(None),
        }
    }

    /// Expired entries are swept on every write so keys that are never read
    /// again do not accumulate.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        let expires_at = now.checked_add(ttl);
        let mut entries = self.entries.lock();
        entries.retain(|_, e| !e.is_expired(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn cache_with_clock() -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = MemoryCache::with_clock(clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        assert!(cache.get("lat=1&lon=2&units=metric").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_returns_exact_text() {
        let cache = MemoryCache::new();
        let raw = r#"{"weather":[{"main":"Clear"}]}"#;
        cache.set("k", raw, CACHE_TTL).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some(raw));
    }

    #[tokio::test]
    async fn test_entry_expires_at_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v", CACHE_TTL).await.unwrap();

        clock.advance(CACHE_TTL - Duration::from_secs(1));
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_last_write_wins() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "first", CACHE_TTL).await.unwrap();
        clock.advance(Duration::from_secs(300));
        cache.set("k", "second", CACHE_TTL).await.unwrap();

        // Second write restarts the TTL
        clock.advance(Duration::from_secs(400));
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_set_sweeps_expired_entries() {
        let (cache, clock) = cache_with_clock();
        cache.set("short", "a", Duration::from_secs(10)).await.unwrap();
        cache.set("long", "b", CACHE_TTL).await.unwrap();

        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.len(), 2);

        cache.set("other", "c", CACHE_TTL).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get("short").await.unwrap().is_none());
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_immediately_absent() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::ZERO).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }
}
