//! Secondary keyed activity store for bearer-token callers.
//!
//! Cookie sessions keep their activity timestamp in the session container;
//! bearer callers have no container, so their timestamp additionally lives
//! here under a per-principal key with a TTL that pads past the inactivity
//! budget. Every operation is best-effort: callers log failures and fall
//! back to the session container.

pub mod client;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rx_core::RxResult;
use uuid::Uuid;

/// Keyed put-with-TTL / get / forget store for last-activity timestamps.
#[async_trait]
pub trait ActivityCache: Send + Sync {
    /// Store the timestamp under the principal's key with the given TTL.
    async fn put(
        &self,
        principal_id: Uuid,
        last_activity_at: DateTime<Utc>,
        ttl_secs: u64,
    ) -> RxResult<()>;

    /// Read the timestamp for a principal, `None` if missing or expired.
    async fn get(&self, principal_id: Uuid) -> RxResult<Option<DateTime<Utc>>>;

    /// Drop the principal's entry if present.
    async fn forget(&self, principal_id: Uuid) -> RxResult<()>;
}

pub use client::RedisActivityCache;
pub use memory::{MemoryActivityCache, UnavailableActivityCache};
