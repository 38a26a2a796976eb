//! Audit sink for session invalidation events.
//!
//! Modules accept an `Arc<dyn AuditSink>`; the default implementation emits
//! a structured tracing record, the capture implementation backs tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// One forced-invalidation audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAuditEvent {
    pub principal_id: Uuid,
    pub principal_email: String,
    pub budget_minutes: i64,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: SessionAuditEvent);
}

/// Emits audit entries as structured log records.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: SessionAuditEvent) {
        info!(
            principal_id = %event.principal_id,
            principal_email = %event.principal_email,
            budget_minutes = event.budget_minutes,
            client_ip = event.client_ip.as_deref().unwrap_or("-"),
            user_agent = event.user_agent.as_deref().unwrap_or("-"),
            "Session invalidated after inactivity"
        );
    }
}

/// In-memory sink that captures audit entries for testing.
#[derive(Default)]
pub struct CaptureAuditSink {
    events: Mutex<Vec<SessionAuditEvent>>,
}

impl CaptureAuditSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<SessionAuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("audit mutex poisoned").len()
    }
}

impl AuditSink for CaptureAuditSink {
    fn record(&self, event: SessionAuditEvent) {
        self.events.lock().expect("audit mutex poisoned").push(event);
    }
}

/// Convenience: tracing-backed sink for production wiring.
pub fn tracing_audit() -> Arc<dyn AuditSink> {
    Arc::new(TracingAuditSink)
}

/// Convenience: capture sink for tests.
pub fn capture_audit() -> Arc<CaptureAuditSink> {
    Arc::new(CaptureAuditSink::new())
}
