//! Reads and writes the last-activity timestamp for a principal.
//!
//! Reads walk an explicit precedence list: session container, then the
//! client-supplied header, then (bearer channel only) the secondary cache,
//! then a fresh "now", so a brand-new session is never expired on first
//! contact. Cache trouble is logged and skipped, never surfaced.

use chrono::{DateTime, Utc};
use rx_cache::ActivityCache;
use rx_core::config::SessionConfig;
use rx_core::types::{ActivityRecord, ActivitySource, Principal};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::RequestContext;

pub struct ActivityStore {
    cache: Arc<dyn ActivityCache>,
    config: SessionConfig,
}

impl ActivityStore {
    pub fn new(cache: Arc<dyn ActivityCache>, config: SessionConfig) -> Self {
        Self { cache, config }
    }

    /// Resolve the current activity record for a principal.
    pub async fn get_last_activity(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> ActivityRecord {
        if let Some(at) = ctx.session_last_activity() {
            return record(principal, at, ActivitySource::Session);
        }

        if let Some(at) = ctx.header_last_activity {
            return record(principal, at, ActivitySource::Header);
        }

        if principal.channel.bearer_token().is_some() {
            match self.cache.get(principal.id).await {
                Ok(Some(at)) => return record(principal, at, ActivitySource::Cache),
                Ok(None) => {}
                Err(e) => {
                    warn!(principal_id = %principal.id, error = %e, "Activity cache read failed, falling through");
                    metrics::counter!("session.cache_read_failures").increment(1);
                }
            }
        }

        // Fail-open: no source means first contact, stamped as of now.
        debug!(principal_id = %principal.id, "No prior activity found, treating as first contact");
        record(principal, now, ActivitySource::Fresh)
    }

    /// Stamp the principal's activity as of `now`. The session container is
    /// always updated; bearer callers also get a cache entry whose TTL pads
    /// past the budget.
    pub async fn set_last_activity(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) {
        ctx.record_session_activity(now);

        if principal.channel.bearer_token().is_some() {
            let ttl = self.config.cache_ttl_seconds();
            if let Err(e) = self.cache.put(principal.id, now, ttl).await {
                warn!(principal_id = %principal.id, error = %e, "Activity cache write failed, session container still updated");
                metrics::counter!("session.cache_write_failures").increment(1);
            }
        }
    }
}

fn record(principal: &Principal, at: DateTime<Utc>, source: ActivitySource) -> ActivityRecord {
    ActivityRecord {
        principal_id: principal.id,
        last_activity_at: at,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySessionContainer;
    use rx_cache::{MemoryActivityCache, UnavailableActivityCache};
    use rx_core::types::AuthChannel;
    use uuid::Uuid;

    fn cookie_principal() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "pharmacist@rxpoint.test".into(),
            roles: vec!["pharmacist".into()],
            channel: AuthChannel::Cookie,
        }
    }

    fn bearer_principal() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "register@rxpoint.test".into(),
            roles: vec!["cashier".into()],
            channel: AuthChannel::Bearer {
                token_id: Uuid::new_v4(),
            },
        }
    }

    fn ctx(header: Option<DateTime<Utc>>) -> RequestContext {
        RequestContext::new(Arc::new(MemorySessionContainer::new()), header, None, None)
    }

    fn store(cache: Arc<dyn ActivityCache>) -> ActivityStore {
        ActivityStore::new(cache, SessionConfig::default())
    }

    #[tokio::test]
    async fn test_session_value_wins_over_header() {
        let store = store(Arc::new(MemoryActivityCache::new()));
        let principal = cookie_principal();
        let now = Utc::now();

        let from_session = now - chrono::Duration::minutes(10);
        let from_header = now - chrono::Duration::minutes(50);
        let ctx = ctx(Some(from_header));
        ctx.record_session_activity(from_session);

        let rec = store.get_last_activity(&principal, &ctx, now).await;
        assert_eq!(rec.source, ActivitySource::Session);
        assert_eq!(rec.last_activity_at, from_session);
    }

    #[tokio::test]
    async fn test_header_fallback() {
        let store = store(Arc::new(MemoryActivityCache::new()));
        let principal = cookie_principal();
        let now = Utc::now();
        let from_header = now - chrono::Duration::minutes(20);

        let rec = store
            .get_last_activity(&principal, &ctx(Some(from_header)), now)
            .await;
        assert_eq!(rec.source, ActivitySource::Header);
        assert_eq!(rec.last_activity_at, from_header);
    }

    #[tokio::test]
    async fn test_bearer_cache_fallback() {
        let cache = Arc::new(MemoryActivityCache::new());
        let store = store(cache.clone());
        let principal = bearer_principal();
        let now = Utc::now();
        let cached = now - chrono::Duration::minutes(15);
        cache.put(principal.id, cached, 600).await.unwrap();

        let rec = store.get_last_activity(&principal, &ctx(None), now).await;
        assert_eq!(rec.source, ActivitySource::Cache);
        assert_eq!(rec.last_activity_at, cached);
    }

    #[tokio::test]
    async fn test_cookie_channel_never_reads_cache() {
        // Independent per-channel clocks: a cookie caller ignores whatever
        // a bearer channel may have cached under the same principal id.
        let cache = Arc::new(MemoryActivityCache::new());
        let store = store(cache.clone());
        let principal = cookie_principal();
        let now = Utc::now();
        cache
            .put(principal.id, now - chrono::Duration::hours(5), 600)
            .await
            .unwrap();

        let rec = store.get_last_activity(&principal, &ctx(None), now).await;
        assert_eq!(rec.source, ActivitySource::Fresh);
        assert_eq!(rec.last_activity_at, now);
    }

    #[tokio::test]
    async fn test_first_contact_fail_open() {
        // No session value, no header, nothing cached: stamped as of now,
        // never expired on the first observed request.
        let store = store(Arc::new(MemoryActivityCache::new()));
        let principal = bearer_principal();
        let now = Utc::now();

        let rec = store.get_last_activity(&principal, &ctx(None), now).await;
        assert_eq!(rec.source, ActivitySource::Fresh);
        assert_eq!(rec.last_activity_at, now);
    }

    #[tokio::test]
    async fn test_cache_read_failure_falls_through() {
        let store = store(Arc::new(UnavailableActivityCache));
        let principal = bearer_principal();
        let now = Utc::now();

        let rec = store.get_last_activity(&principal, &ctx(None), now).await;
        assert_eq!(rec.source, ActivitySource::Fresh);
    }

    #[tokio::test]
    async fn test_set_updates_session_and_cache_for_bearer() {
        let cache = Arc::new(MemoryActivityCache::new());
        let store = store(cache.clone());
        let principal = bearer_principal();
        let ctx = ctx(None);
        let now = Utc::now();

        store.set_last_activity(&principal, &ctx, now).await;

        assert_eq!(ctx.session_last_activity(), Some(now));
        assert_eq!(cache.get(principal.id).await.unwrap(), Some(now));
    }

    #[tokio::test]
    async fn test_set_skips_cache_for_cookie_channel() {
        let cache = Arc::new(MemoryActivityCache::new());
        let store = store(cache.clone());
        let principal = cookie_principal();
        let ctx = ctx(None);

        store.set_last_activity(&principal, &ctx, Utc::now()).await;

        assert!(ctx.session_last_activity().is_some());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_set_survives_cache_write_failure() {
        let store = store(Arc::new(UnavailableActivityCache));
        let principal = bearer_principal();
        let ctx = ctx(None);
        let now = Utc::now();

        // Must not error or panic; session container still updated.
        store.set_last_activity(&principal, &ctx, now).await;
        assert_eq!(ctx.session_last_activity(), Some(now));
    }
}
