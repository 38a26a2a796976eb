//! The heartbeat client: request/response interceptors plus the local
//! countdown, sharing one idempotent logout latch.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rx_core::types::{ERROR_CODE_SESSION_TIMEOUT, HEADER_LAST_ACTIVITY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::countdown::{CountdownSignal, IdleCountdown};
use crate::storage::ClientStorage;

/// What the caller should do with a response it just received. The
/// interceptor never retries anything itself; retry policy stays with the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseDisposition {
    /// Nothing for this layer; hand the response to the caller.
    Proceed,
    /// Idle timeout confirmed by the server: credentials are cleared,
    /// navigate to the login entry point. Emitted at most once.
    Logout { redirect_to: String },
    /// 422: field-level validation errors, surfaced unmodified.
    ValidationErrors(serde_json::Value),
    /// A 401 without the timeout code. Could be an unrelated credential
    /// problem; session state is left untouched.
    AmbiguousAuthFailure,
    /// 5xx: logged, no redirect.
    ServerError { status: u16 },
}

/// What the caller should do after a countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    ShowWarning { remaining_seconds: u64 },
    /// Local budget crossed: same logout flow as a server-confirmed
    /// timeout. The server remains authoritative either way.
    Logout { redirect_to: String },
}

pub struct HeartbeatClient {
    storage: Arc<dyn ClientStorage>,
    countdown: Mutex<IdleCountdown>,
    logged_out: AtomicBool,
    login_path: String,
}

impl HeartbeatClient {
    pub fn new(
        storage: Arc<dyn ClientStorage>,
        budget_minutes: i64,
        warning_minutes: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            storage,
            countdown: Mutex::new(IdleCountdown::new(budget_minutes, warning_minutes, now)),
            logged_out: AtomicBool::new(false),
            login_path: "/login".to_string(),
        }
    }

    /// Request interceptor. Returns the activity header to attach, valued
    /// at the activity as of the *previous* call, then stamps storage with
    /// `now`. The server gets to measure the true idle gap instead of a
    /// self-reported fresh value.
    pub fn before_request(&self, now: DateTime<Utc>) -> (&'static str, String) {
        let reported = self.storage.last_activity().unwrap_or(now);
        self.storage.set_last_activity(now);
        self.countdown.lock().record_activity(now);
        (HEADER_LAST_ACTIVITY, reported.to_rfc3339())
    }

    /// Response interceptor.
    pub fn on_response(&self, status: u16, body: &serde_json::Value) -> ResponseDisposition {
        match status {
            401 => {
                if body["error_code"] == ERROR_CODE_SESSION_TIMEOUT {
                    self.logout()
                } else {
                    warn!(status, "401 without timeout code, leaving session state untouched");
                    ResponseDisposition::AmbiguousAuthFailure
                }
            }
            422 => ResponseDisposition::ValidationErrors(body["errors"].clone()),
            s if s >= 500 => {
                warn!(status = s, "Server error response");
                ResponseDisposition::ServerError { status: s }
            }
            _ => ResponseDisposition::Proceed,
        }
    }

    /// Persist the server's evaluation timestamp from the telemetry headers.
    pub fn observe_server_activity(&self, at: DateTime<Utc>) {
        self.storage.set_last_activity(at);
    }

    /// Advance the local countdown.
    pub fn tick(&self, now: DateTime<Utc>) -> Option<TickAction> {
        let signal = self.countdown.lock().tick(now)?;
        match signal {
            CountdownSignal::WarnExpiring { remaining_seconds } => {
                Some(TickAction::ShowWarning { remaining_seconds })
            }
            CountdownSignal::Expired => match self.logout() {
                ResponseDisposition::Logout { redirect_to } => {
                    Some(TickAction::Logout { redirect_to })
                }
                _ => None,
            },
        }
    }

    /// Tear down when the authenticated app root unmounts.
    pub fn cancel(&self) {
        self.countdown.lock().cancel();
    }

    /// Idempotent logout: the first trigger clears credentials and yields
    /// the redirect; any later trigger (local expiry racing a server 401)
    /// is a no-op.
    fn logout(&self) -> ResponseDisposition {
        if self.logged_out.swap(true, Ordering::SeqCst) {
            return ResponseDisposition::Proceed;
        }
        self.storage.clear();
        ResponseDisposition::Logout {
            redirect_to: self.login_path.clone(),
        }
    }
}
