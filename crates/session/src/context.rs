//! Per-request context: the session container handle plus the request
//! attributes the subsystem reads. Built once by the gateway and passed
//! explicitly to every operation.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Session-container key under which the last-activity timestamp is stored
/// (RFC 3339 string).
pub const SESSION_KEY_LAST_ACTIVITY: &str = "last_activity_at";

/// Server-side session state for one principal. Implementations are handed
/// to this subsystem by the authentication layer; the in-memory one lives in
/// [`crate::memory`].
pub trait SessionContainer: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    /// Destroy all state in this container. Subsequent reads return nothing.
    fn destroy(&self);
    fn is_destroyed(&self) -> bool;
    /// Replace the anti-forgery token with a fresh one.
    fn rotate_csrf_token(&self);
}

/// Everything the tracker needs from the inbound request.
#[derive(Clone)]
pub struct RequestContext {
    pub session: Arc<dyn SessionContainer>,
    /// Parsed `X-Last-Activity` header, if the client sent one.
    pub header_last_activity: Option<DateTime<Utc>>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    auth_valid: Arc<AtomicBool>,
}

impl RequestContext {
    pub fn new(
        session: Arc<dyn SessionContainer>,
        header_last_activity: Option<DateTime<Utc>>,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            session,
            header_last_activity,
            client_ip,
            user_agent,
            auth_valid: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Last-activity value stored in the session container, if present and
    /// well-formed.
    pub fn session_last_activity(&self) -> Option<DateTime<Utc>> {
        let raw = self.session.get(SESSION_KEY_LAST_ACTIVITY)?;
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Write the last-activity value into the session container.
    pub fn record_session_activity(&self, at: DateTime<Utc>) {
        self.session.put(SESSION_KEY_LAST_ACTIVITY, at.to_rfc3339());
    }

    /// Mark the authentication context cleared for the rest of the request.
    pub fn clear_auth(&self) {
        self.auth_valid.store(false, Ordering::SeqCst);
    }

    pub fn is_auth_valid(&self) -> bool {
        self.auth_valid.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySessionContainer;

    #[test]
    fn test_session_last_activity_roundtrip() {
        let ctx = RequestContext::new(
            Arc::new(MemorySessionContainer::new()),
            None,
            Some("127.0.0.1".into()),
            Some("test-agent".into()),
        );

        assert_eq!(ctx.session_last_activity(), None);

        let at = Utc::now();
        ctx.record_session_activity(at);
        let stored = ctx.session_last_activity().unwrap();
        // RFC 3339 round-trip keeps sub-second precision.
        assert_eq!(stored, at);
    }

    #[test]
    fn test_malformed_session_value_ignored() {
        let ctx = RequestContext::new(Arc::new(MemorySessionContainer::new()), None, None, None);
        ctx.session
            .put(SESSION_KEY_LAST_ACTIVITY, "not-a-timestamp".into());
        assert_eq!(ctx.session_last_activity(), None);
    }

    #[test]
    fn test_clear_auth() {
        let ctx = RequestContext::new(Arc::new(MemorySessionContainer::new()), None, None, None);
        assert!(ctx.is_auth_valid());
        ctx.clear_auth();
        assert!(!ctx.is_auth_valid());
    }
}
