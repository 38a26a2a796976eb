//! Shared types for the session activity and timeout subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request header the client attaches to every call: its last known
/// activity timestamp (RFC 3339).
pub const HEADER_LAST_ACTIVITY: &str = "x-last-activity";

/// Response header: total inactivity budget in seconds.
pub const HEADER_SESSION_TIMEOUT: &str = "x-session-timeout";

/// Response header: RFC 3339 timestamp of this evaluation.
pub const HEADER_SESSION_LAST_ACTIVITY: &str = "x-session-last-activity";

/// Response header: seconds until expiry, computed from the pre-update
/// activity value.
pub const HEADER_SESSION_TIME_REMAINING: &str = "x-session-time-remaining";

/// Machine-readable code carried in the 401 body on idle timeout, so the
/// client can tell it apart from unrelated authentication failures.
pub const ERROR_CODE_SESSION_TIMEOUT: &str = "SESSION_TIMEOUT";

/// How the caller authenticated. Cookie sessions and bearer tokens keep
/// independent activity clocks; there is no cross-channel reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthChannel {
    Cookie,
    Bearer { token_id: Uuid },
}

impl AuthChannel {
    /// The token id presented on this request, when the channel is bearer.
    pub fn bearer_token(&self) -> Option<Uuid> {
        match self {
            AuthChannel::Bearer { token_id } => Some(*token_id),
            AuthChannel::Cookie => None,
        }
    }
}

/// An authenticated actor. Owned by the authorization collaborator; this
/// subsystem only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub channel: AuthChannel,
}

/// Where a resolved last-activity value came from. Precedence is
/// session container, then client header, then cache (bearer only),
/// then a fresh fail-open default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    Session,
    Header,
    Cache,
    Fresh,
}

/// The resolved activity record for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub principal_id: Uuid,
    pub last_activity_at: DateTime<Utc>,
    pub source: ActivitySource,
}

/// Per-request expiry decision. Ephemeral; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryDecision {
    pub expired: bool,
    pub remaining_seconds: u64,
}
