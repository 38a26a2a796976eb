//! Redis-backed activity cache.

use crate::ActivityCache;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use rx_core::config::RedisConfig;
use rx_core::{RxError, RxResult};
use tracing::{debug, info};
use uuid::Uuid;

fn activity_key(principal_id: Uuid) -> String {
    format!("activity:{principal_id}")
}

/// Redis-backed implementation of [`ActivityCache`].
pub struct RedisActivityCache {
    client: redis::Client,
}

impl RedisActivityCache {
    /// Connect to Redis and verify connectivity with a PING.
    pub async fn new(config: &RedisConfig) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(url.as_str())?;

        let mut conn = client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "Redis connection established");

        Ok(Self { client })
    }

    async fn connection(&self) -> RxResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RxError::Cache(e.to_string()))
    }
}

#[async_trait]
impl ActivityCache for RedisActivityCache {
    async fn put(
        &self,
        principal_id: Uuid,
        last_activity_at: DateTime<Utc>,
        ttl_secs: u64,
    ) -> RxResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(
            activity_key(principal_id),
            last_activity_at.to_rfc3339(),
            ttl_secs,
        )
        .await
        .map_err(|e| RxError::Cache(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, principal_id: Uuid) -> RxResult<Option<DateTime<Utc>>> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn
            .get(activity_key(principal_id))
            .await
            .map_err(|e| RxError::Cache(e.to_string()))?;

        match data {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| RxError::Cache(format!("bad activity timestamp: {e}")))?;
                metrics::counter!("cache.activity.hit").increment(1);
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => {
                metrics::counter!("cache.activity.miss").increment(1);
                debug!(principal_id = %principal_id, "No cached activity entry");
                Ok(None)
            }
        }
    }

    async fn forget(&self, principal_id: Uuid) -> RxResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(activity_key(principal_id))
            .await
            .map_err(|e| RxError::Cache(e.to_string()))?;
        Ok(())
    }
}
