//! In-process cache used for short-TTL memoized reads (category/brand
//! listings, settings-style aggregates). Values are stored as JSON strings
//! behind the `CacheBackend` trait; `CachedValue` layers a typed
//! load-through on top.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
}

// In-memory cache implementation
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    capacity: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            Instant::now() > expires_at
        } else {
            false
        }
    }
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let store = self.store.read().unwrap();
        if let Some(entry) = store.get(key) {
            if entry.is_expired() {
                drop(store);
                let mut store = self.store.write().unwrap();
                store.remove(key);
                Ok(None)
            } else {
                Ok(Some(entry.value.clone()))
            }
        } else {
            Ok(None)
        }
    }

    pub async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut store = self.store.write().unwrap();
        if store.len() >= self.capacity && !store.contains_key(key) {
            // Evict expired entries before refusing new ones
            store.retain(|_, entry| !entry.is_expired());
            if store.len() >= self.capacity {
                return Err(CacheError::OperationFailed("cache capacity reached".into()));
            }
        }
        store.insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut store = self.store.write().unwrap();
        store.remove(key);
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let store = self.store.read().unwrap();
        if let Some(entry) = store.get(key) {
            Ok(!entry.is_expired())
        } else {
            Ok(false)
        }
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut store = self.store.write().unwrap();
        store.clear();
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.exists(key).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.clear().await
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

pub type Cache = InMemoryCache;

/// Typed load-through wrapper over a cache key: callers provide a loader and
/// get the memoized value while the TTL holds, the freshly loaded one after.
pub struct CachedValue<T> {
    key: String,
    ttl: Duration,
    _marker: PhantomData<T>,
}

impl<T> CachedValue<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            ttl,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the cached value when fresh, otherwise runs the loader and
    /// stores its result. Loader errors pass through untouched; cache write
    /// failures do not fail the read.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        cache: &dyn CacheBackend,
        loader: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Ok(Some(raw)) = cache.get(&self.key).await {
            if let Ok(value) = serde_json::from_str(&raw) {
                return Ok(value);
            }
            // Unreadable entry: drop it and fall through to the loader
            let _ = cache.delete(&self.key).await;
        }

        let value = loader().await?;
        if let Ok(raw) = serde_json::to_string(&value) {
            if let Err(e) = cache.set(&self.key, &raw, Some(self.ttl)).await {
                tracing::warn!("Failed to populate cache key {}: {}", self.key, e);
            }
        }
        Ok(value)
    }

    pub async fn invalidate(&self, cache: &dyn CacheBackend) {
        let _ = cache.delete(&self.key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_after_expiry() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn cached_value_loads_once_within_ttl() {
        let cache = InMemoryCache::new();
        let cached: CachedValue<Vec<i64>> =
            CachedValue::new("ids", Duration::from_secs(60));

        let first: Result<Vec<i64>, CacheError> =
            cached.get_or_load(&cache, || async { Ok(vec![1, 2, 3]) }).await;
        assert_eq!(first.unwrap(), vec![1, 2, 3]);

        // Second read must come from the cache, not the loader
        let second: Result<Vec<i64>, CacheError> = cached
            .get_or_load(&cache, || async {
                panic!("loader must not run on a warm cache")
            })
            .await;
        assert_eq!(second.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = InMemoryCache::new();
        let cached: CachedValue<u32> = CachedValue::new("count", Duration::from_secs(60));

        let _: Result<u32, CacheError> = cached.get_or_load(&cache, || async { Ok(1) }).await;
        cached.invalidate(&cache).await;

        let reloaded: Result<u32, CacheError> =
            cached.get_or_load(&cache, || async { Ok(2) }).await;
        assert_eq!(reloaded.unwrap(), 2);
    }
}
