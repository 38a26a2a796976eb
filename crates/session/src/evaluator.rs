//! Pure idle-timeout arithmetic. No clocks, no side effects.

use chrono::{DateTime, Utc};
use rx_core::types::ExpiryDecision;

/// Decide whether a session has exceeded its inactivity budget.
///
/// Expiry uses strict inequality: a session exactly at the budget is still
/// alive. `remaining_seconds` is `max(0, budget − elapsed)`; a last-activity
/// timestamp in the future (clock skew between writers) simply yields a
/// larger remainder, no compensation is attempted.
pub fn evaluate(
    now: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    budget_minutes: i64,
) -> ExpiryDecision {
    let budget_secs = budget_minutes * 60;
    let elapsed_secs = now.signed_duration_since(last_activity_at).num_seconds();

    let expired = elapsed_secs > budget_secs;
    let remaining_seconds = (budget_secs - elapsed_secs).max(0) as u64;

    ExpiryDecision {
        expired,
        remaining_seconds,
    }
}
