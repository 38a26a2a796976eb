//! Forced session teardown on idle expiry (and explicit logout).
//!
//! Runs a fixed sequence of cleanup steps. Each step is individually
//! best-effort: a failure is logged and collected, the remaining steps
//! still run, and the caller always gets its 401 out.

use chrono::Utc;
use rx_cache::ActivityCache;
use rx_core::types::Principal;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::audit::{AuditSink, SessionAuditEvent};
use crate::context::RequestContext;

/// Revokes exactly the presented bearer credential, never the principal's
/// other credentials. Returns whether the credential existed.
pub trait CredentialRevoker: Send + Sync {
    fn revoke(&self, token_id: Uuid) -> anyhow::Result<bool>;
}

/// Cleanup steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationStep {
    Audit,
    DestroySession,
    RevokeCredential,
    ClearCachedActivity,
    ClearAuthContext,
}

/// Outcome of one invalidation pass, for tests and telemetry. The hot path
/// ignores it.
#[derive(Debug, Default)]
pub struct InvalidationReport {
    /// The session container was already destroyed; nothing was done.
    pub already_invalidated: bool,
    pub failed_steps: Vec<(InvalidationStep, String)>,
}

pub struct SessionInvalidator {
    cache: Arc<dyn ActivityCache>,
    revoker: Arc<dyn CredentialRevoker>,
    audit: Arc<dyn AuditSink>,
    budget_minutes: i64,
}

impl SessionInvalidator {
    pub fn new(
        cache: Arc<dyn ActivityCache>,
        revoker: Arc<dyn CredentialRevoker>,
        audit: Arc<dyn AuditSink>,
        budget_minutes: i64,
    ) -> Self {
        Self {
            cache,
            revoker,
            audit,
            budget_minutes,
        }
    }

    /// Tear down the principal's session. Safe to call more than once: a
    /// container that is already destroyed makes the whole call a no-op, so
    /// a double expiry never writes a second audit entry.
    pub async fn invalidate(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
    ) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        if ctx.session.is_destroyed() {
            debug!(principal_id = %principal.id, "Session already invalidated, skipping");
            report.already_invalidated = true;
            return report;
        }

        // 1. Audit entry first, while the session state still exists.
        self.audit.record(SessionAuditEvent {
            principal_id: principal.id,
            principal_email: principal.email.clone(),
            budget_minutes: self.budget_minutes,
            client_ip: ctx.client_ip.clone(),
            user_agent: ctx.user_agent.clone(),
            timestamp: Utc::now(),
        });

        // 2. Destroy server-side session state and rotate the anti-forgery
        //    token.
        ctx.session.destroy();
        ctx.session.rotate_csrf_token();

        // 3. Revoke exactly the presented bearer credential, if any.
        if let Some(token_id) = principal.channel.bearer_token() {
            if let Err(e) = self.revoker.revoke(token_id) {
                self.record_failure(&mut report, InvalidationStep::RevokeCredential, principal, e);
            }
        }

        // 4. Clear the cached activity entry.
        if let Err(e) = self.cache.forget(principal.id).await {
            self.record_failure(
                &mut report,
                InvalidationStep::ClearCachedActivity,
                principal,
                e.into(),
            );
        }

        // 5. Clear the authentication context for the rest of the request.
        ctx.clear_auth();

        report
    }

    fn record_failure(
        &self,
        report: &mut InvalidationReport,
        step: InvalidationStep,
        principal: &Principal,
        err: anyhow::Error,
    ) {
        error!(
            principal_id = %principal.id,
            step = ?step,
            error = ?err,
            "Invalidation step failed, continuing with remaining steps"
        );
        metrics::counter!("session.invalidation_step_failures").increment(1);
        report.failed_steps.push((step, format!("{err:#}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::capture_audit;
    use crate::memory::{MemoryRevoker, MemorySessionContainer};
    use rx_cache::{MemoryActivityCache, UnavailableActivityCache};
    use rx_core::types::AuthChannel;

    struct FailingRevoker;

    impl CredentialRevoker for FailingRevoker {
        fn revoke(&self, _token_id: Uuid) -> anyhow::Result<bool> {
            anyhow::bail!("token service unreachable")
        }
    }

    fn bearer_principal(token_id: Uuid) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "pharmacist@rxpoint.test".into(),
            roles: vec!["pharmacist".into()],
            channel: AuthChannel::Bearer { token_id },
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            Arc::new(MemorySessionContainer::new()),
            None,
            Some("10.0.0.8".into()),
            Some("pos-terminal".into()),
        )
    }

    #[tokio::test]
    async fn test_full_invalidation() {
        let cache = Arc::new(MemoryActivityCache::new());
        let revoker = Arc::new(MemoryRevoker::new());
        let audit = capture_audit();
        let token_id = Uuid::new_v4();
        let principal = bearer_principal(token_id);
        let ctx = ctx();

        cache.put(principal.id, Utc::now(), 600).await.unwrap();
        ctx.record_session_activity(Utc::now());
        let csrf_before = ctx.session.get("csrf_token");

        let invalidator =
            SessionInvalidator::new(cache.clone(), revoker.clone(), audit.clone(), 60);
        let report = invalidator.invalidate(&principal, &ctx).await;

        assert!(!report.already_invalidated);
        assert!(report.failed_steps.is_empty());
        assert_eq!(audit.count(), 1);
        assert_eq!(audit.events()[0].principal_email, principal.email);
        assert_eq!(audit.events()[0].client_ip.as_deref(), Some("10.0.0.8"));

        assert!(ctx.session.is_destroyed());
        assert!(ctx.session_last_activity().is_none());
        assert_ne!(ctx.session.get("csrf_token"), csrf_before);
        assert!(revoker.is_revoked(token_id));
        assert_eq!(cache.get(principal.id).await.unwrap(), None);
        assert!(!ctx.is_auth_valid());
    }

    #[tokio::test]
    async fn test_second_invocation_is_noop() {
        let audit = capture_audit();
        let principal = bearer_principal(Uuid::new_v4());
        let ctx = ctx();

        let invalidator = SessionInvalidator::new(
            Arc::new(MemoryActivityCache::new()),
            Arc::new(MemoryRevoker::new()),
            audit.clone(),
            60,
        );

        let first = invalidator.invalidate(&principal, &ctx).await;
        let second = invalidator.invalidate(&principal, &ctx).await;

        assert!(!first.already_invalidated);
        assert!(second.already_invalidated);
        // No second audit entry.
        assert_eq!(audit.count(), 1);
    }

    #[tokio::test]
    async fn test_failing_step_does_not_stop_the_rest() {
        let cache = Arc::new(MemoryActivityCache::new());
        let audit = capture_audit();
        let principal = bearer_principal(Uuid::new_v4());
        let ctx = ctx();
        cache.put(principal.id, Utc::now(), 600).await.unwrap();

        let invalidator =
            SessionInvalidator::new(cache.clone(), Arc::new(FailingRevoker), audit.clone(), 60);
        let report = invalidator.invalidate(&principal, &ctx).await;

        assert_eq!(report.failed_steps.len(), 1);
        assert_eq!(report.failed_steps[0].0, InvalidationStep::RevokeCredential);
        // Later steps still ran.
        assert_eq!(cache.get(principal.id).await.unwrap(), None);
        assert!(ctx.session.is_destroyed());
        assert!(!ctx.is_auth_valid());
        assert_eq!(audit.count(), 1);
    }

    #[tokio::test]
    async fn test_cache_failure_collected_not_raised() {
        let principal = bearer_principal(Uuid::new_v4());
        let ctx = ctx();

        let invalidator = SessionInvalidator::new(
            Arc::new(UnavailableActivityCache),
            Arc::new(MemoryRevoker::new()),
            capture_audit(),
            60,
        );
        let report = invalidator.invalidate(&principal, &ctx).await;

        assert_eq!(report.failed_steps.len(), 1);
        assert_eq!(
            report.failed_steps[0].0,
            InvalidationStep::ClearCachedActivity
        );
        assert!(ctx.session.is_destroyed());
    }

    #[tokio::test]
    async fn test_cookie_channel_skips_revocation() {
        let revoker = Arc::new(MemoryRevoker::new());
        let principal = Principal {
            id: Uuid::new_v4(),
            email: "clerk@rxpoint.test".into(),
            roles: vec![],
            channel: AuthChannel::Cookie,
        };
        let ctx = ctx();

        let invalidator = SessionInvalidator::new(
            Arc::new(MemoryActivityCache::new()),
            revoker.clone(),
            capture_audit(),
            60,
        );
        let report = invalidator.invalidate(&principal, &ctx).await;

        assert!(report.failed_steps.is_empty());
        assert_eq!(revoker.revoked_count(), 0);
    }
}
