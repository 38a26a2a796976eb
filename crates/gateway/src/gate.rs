//! The request gate: per-request idle-timeout check.
//!
//! Anonymous traffic passes straight through. For authenticated callers the
//! gate resolves the activity record, evaluates it against the budget, and
//! either rejects with a structured 401 (after tearing the session down) or
//! refreshes the activity stamp and decorates the response with timeout
//! telemetry headers.

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rx_core::config::SessionConfig;
use rx_core::types::{
    Principal, ERROR_CODE_SESSION_TIMEOUT, HEADER_SESSION_LAST_ACTIVITY, HEADER_SESSION_TIMEOUT,
    HEADER_SESSION_TIME_REMAINING,
};
use rx_session::{evaluate, ActivityStore, RequestContext, SessionInvalidator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error body returned on idle-timeout rejection. The `error_code` lets the
/// client distinguish this from unrelated 401s.
#[derive(Debug, Serialize)]
pub struct TimeoutResponse {
    pub success: bool,
    pub message: String,
    pub error_code: String,
    pub timeout_minutes: i64,
}

/// State shared by every gate evaluation.
#[derive(Clone)]
pub struct GateState {
    pub store: Arc<ActivityStore>,
    pub invalidator: Arc<SessionInvalidator>,
    pub session: SessionConfig,
}

/// axum middleware implementing the gate.
pub async fn session_gate(State(state): State<GateState>, req: Request, next: Next) -> Response {
    let principal = req.extensions().get::<Principal>().cloned();
    let ctx = req.extensions().get::<RequestContext>().cloned();

    let (principal, ctx) = match (principal, ctx) {
        (Some(p), Some(c)) => (p, c),
        // No authenticated principal: the gate is a no-op.
        _ => return next.run(req).await,
    };

    let now = Utc::now();
    let record = state.store.get_last_activity(&principal, &ctx, now).await;
    let decision = evaluate(now, record.last_activity_at, state.session.timeout_minutes);

    if decision.expired {
        warn!(
            principal_id = %principal.id,
            last_activity_at = %record.last_activity_at,
            source = ?record.source,
            budget_minutes = state.session.timeout_minutes,
            "Session expired due to inactivity, rejecting request"
        );
        metrics::counter!("gate.rejected").increment(1);

        // Teardown must complete before the response body is built; its own
        // failures are logged inside and never block the 401.
        state.invalidator.invalidate(&principal, &ctx).await;

        let body = TimeoutResponse {
            success: false,
            message: "session expired due to inactivity".to_string(),
            error_code: ERROR_CODE_SESSION_TIMEOUT.to_string(),
            timeout_minutes: state.session.timeout_minutes,
        };
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    debug!(
        principal_id = %principal.id,
        source = ?record.source,
        remaining_seconds = decision.remaining_seconds,
        "Session active, refreshing activity stamp"
    );
    metrics::counter!("gate.passed").increment(1);

    state.store.set_last_activity(&principal, &ctx, now).await;

    let mut response = next.run(req).await;
    decorate(
        &mut response,
        state.session.budget_seconds(),
        &now.to_rfc3339(),
        decision.remaining_seconds,
    );
    response
}

/// Attach the three telemetry headers. `remaining` comes from the pre-update
/// activity value, so the client sees the window that was actually open when
/// the request arrived.
fn decorate(response: &mut Response, budget_secs: i64, evaluated_at: &str, remaining: u64) {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(HEADER_SESSION_TIMEOUT),
        HeaderValue::from(budget_secs.max(0) as u64),
    );
    if let Ok(value) = HeaderValue::from_str(evaluated_at) {
        headers.insert(HeaderName::from_static(HEADER_SESSION_LAST_ACTIVITY), value);
    }
    headers.insert(
        HeaderName::from_static(HEADER_SESSION_TIME_REMAINING),
        HeaderValue::from(remaining),
    );
}
