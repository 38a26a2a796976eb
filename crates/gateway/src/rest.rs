//! REST handlers: health probe, session status, explicit logout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use rx_core::types::Principal;
use rx_session::{evaluate, RequestContext};
use serde::Serialize;
use uuid::Uuid;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct SessionStatusResponse {
    pub principal_id: Uuid,
    pub email: String,
    pub timeout_minutes: i64,
    pub warning_minutes: i64,
    pub remaining_seconds: u64,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// GET /health — liveness probe; anonymous, so the gate skips it.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /v1/session — current timeout state for the caller. Passing the gate
/// already refreshed the activity stamp, so this doubles as the client's
/// "extend session" touch.
pub async fn session_status(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    ctx: Option<Extension<RequestContext>>,
) -> Result<Json<SessionStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (Some(Extension(principal)), Some(Extension(ctx))) = (principal, ctx) else {
        return Err(not_authenticated());
    };

    let now = Utc::now();
    let last = ctx.session_last_activity().unwrap_or(now);
    let decision = evaluate(now, last, state.gate.session.timeout_minutes);

    Ok(Json(SessionStatusResponse {
        principal_id: principal.id,
        email: principal.email.clone(),
        timeout_minutes: state.gate.session.timeout_minutes,
        warning_minutes: state.gate.session.warning_minutes,
        remaining_seconds: decision.remaining_seconds,
    }))
}

/// POST /v1/logout — explicit logout through the same teardown path as an
/// idle expiry.
pub async fn logout(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    ctx: Option<Extension<RequestContext>>,
) -> Result<Json<LogoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (Some(Extension(principal)), Some(Extension(ctx))) = (principal, ctx) else {
        return Err(not_authenticated());
    };

    state.gate.invalidator.invalidate(&principal, &ctx).await;

    Ok(Json(LogoutResponse {
        success: true,
        message: "logged out".to_string(),
    }))
}

fn not_authenticated() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "not_authenticated".to_string(),
            message: "This endpoint requires an authenticated session".to_string(),
        }),
    )
}
