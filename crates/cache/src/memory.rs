//! In-process activity cache backed by DashMap for lock-free concurrent
//! access. Used when Redis is not configured and by tests.

use crate::ActivityCache;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rx_core::{RxError, RxResult};
use std::time::{Duration, Instant};
use uuid::Uuid;

struct CacheEntry {
    last_activity_at: DateTime<Utc>,
    inserted_at: Instant,
    ttl: Duration,
}

/// Lock-free in-memory implementation of [`ActivityCache`].
#[derive(Default)]
pub struct MemoryActivityCache {
    store: DashMap<Uuid, CacheEntry>,
}

impl MemoryActivityCache {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Remove expired entries. Call this periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        let before = self.store.len();
        self.store
            .retain(|_, entry| entry.inserted_at.elapsed() <= entry.ttl);
        before - self.store.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl ActivityCache for MemoryActivityCache {
    async fn put(
        &self,
        principal_id: Uuid,
        last_activity_at: DateTime<Utc>,
        ttl_secs: u64,
    ) -> RxResult<()> {
        self.store.insert(
            principal_id,
            CacheEntry {
                last_activity_at,
                inserted_at: Instant::now(),
                ttl: Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn get(&self, principal_id: Uuid) -> RxResult<Option<DateTime<Utc>>> {
        let expired = match self.store.get(&principal_id) {
            Some(entry) => {
                if entry.inserted_at.elapsed() > entry.ttl {
                    true
                } else {
                    return Ok(Some(entry.last_activity_at));
                }
            }
            None => return Ok(None),
        };
        if expired {
            self.store.remove(&principal_id);
        }
        Ok(None)
    }

    async fn forget(&self, principal_id: Uuid) -> RxResult<()> {
        self.store.remove(&principal_id);
        Ok(())
    }
}

/// An [`ActivityCache`] that fails every operation. Stands in for an
/// unreachable Redis node when exercising the degraded-store paths.
pub struct UnavailableActivityCache;

#[async_trait]
impl ActivityCache for UnavailableActivityCache {
    async fn put(&self, _: Uuid, _: DateTime<Utc>, _: u64) -> RxResult<()> {
        Err(RxError::Cache("activity cache unavailable".into()))
    }

    async fn get(&self, _: Uuid) -> RxResult<Option<DateTime<Utc>>> {
        Err(RxError::Cache("activity cache unavailable".into()))
    }

    async fn forget(&self, _: Uuid) -> RxResult<()> {
        Err(RxError::Cache("activity cache unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_forget() {
        let cache = MemoryActivityCache::new();
        let id = Uuid::new_v4();
        let at = Utc::now();

        cache.put(id, at, 60).await.unwrap();
        assert_eq!(cache.get(id).await.unwrap(), Some(at));
        assert_eq!(cache.len(), 1);

        cache.forget(id).await.unwrap();
        assert_eq!(cache.get(id).await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = MemoryActivityCache::new();
        let id = Uuid::new_v4();

        // Zero TTL expires immediately.
        cache.put(id, Utc::now(), 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let cache = MemoryActivityCache::new();
        cache.put(Uuid::new_v4(), Utc::now(), 0).await.unwrap();
        cache.put(Uuid::new_v4(), Utc::now(), 600).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_cache_errors() {
        let cache = UnavailableActivityCache;
        assert!(cache.put(Uuid::new_v4(), Utc::now(), 60).await.is_err());
        assert!(cache.get(Uuid::new_v4()).await.is_err());
        assert!(cache.forget(Uuid::new_v4()).await.is_err());
    }
}
