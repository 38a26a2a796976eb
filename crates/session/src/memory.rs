//! In-memory collaborators backed by DashMap: the session container and the
//! credential revoker. Production deployments swap in the platform's own
//! implementations; the demo wiring and the tests use these.

use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::context::SessionContainer;

/// Session-container key holding the anti-forgery token.
pub const SESSION_KEY_CSRF_TOKEN: &str = "csrf_token";

/// DashMap-backed session container. `destroy` wipes all values and marks
/// the container; a destroyed container is never handed out again by the
/// gateway, the flag only makes repeated invalidation a no-op.
pub struct MemorySessionContainer {
    values: DashMap<String, String>,
    destroyed: AtomicBool,
}

impl Default for MemorySessionContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionContainer {
    pub fn new() -> Self {
        let values = DashMap::new();
        values.insert(SESSION_KEY_CSRF_TOKEN.to_string(), Uuid::new_v4().to_string());
        Self {
            values,
            destroyed: AtomicBool::new(false),
        }
    }
}

impl SessionContainer for MemorySessionContainer {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.clone())
    }

    fn put(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.remove(key);
    }

    fn destroy(&self) {
        self.values.clear();
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn rotate_csrf_token(&self) {
        self.values.insert(
            SESSION_KEY_CSRF_TOKEN.to_string(),
            Uuid::new_v4().to_string(),
        );
    }
}

/// Records revocations of individual bearer credentials.
#[derive(Default)]
pub struct MemoryRevoker {
    revoked: DashSet<Uuid>,
}

impl MemoryRevoker {
    pub fn new() -> Self {
        Self {
            revoked: DashSet::new(),
        }
    }

    pub fn is_revoked(&self, token_id: Uuid) -> bool {
        self.revoked.contains(&token_id)
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }
}

impl crate::invalidator::CredentialRevoker for MemoryRevoker {
    fn revoke(&self, token_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.revoked.insert(token_id))
    }
}
