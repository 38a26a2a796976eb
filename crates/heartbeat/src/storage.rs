//! Durable client-side storage for the heartbeat: the last known activity
//! timestamp and the stored credential. A browser host backs this with
//! localStorage; tests and native hosts use the in-memory implementation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub trait ClientStorage: Send + Sync {
    fn last_activity(&self) -> Option<DateTime<Utc>>;
    fn set_last_activity(&self, at: DateTime<Utc>);
    fn credentials(&self) -> Option<String>;
    fn set_credentials(&self, token: String);
    /// Wipe everything. Called exactly once per logout.
    fn clear(&self);
}

#[derive(Default)]
struct Inner {
    last_activity: Option<DateTime<Utc>>,
    credentials: Option<String>,
}

/// In-memory [`ClientStorage`].
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStorage for MemoryStorage {
    fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().last_activity
    }

    fn set_last_activity(&self, at: DateTime<Utc>) {
        self.inner.lock().last_activity = Some(at);
    }

    fn credentials(&self) -> Option<String> {
        self.inner.lock().credentials.clone()
    }

    fn set_credentials(&self, token: String) {
        self.inner.lock().credentials = Some(token);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.last_activity = None;
        inner.credentials = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_clear() {
        let storage = MemoryStorage::new();
        assert!(storage.last_activity().is_none());

        let at = Utc::now();
        storage.set_last_activity(at);
        storage.set_credentials("tok-1".into());
        assert_eq!(storage.last_activity(), Some(at));
        assert_eq!(storage.credentials().as_deref(), Some("tok-1"));

        storage.clear();
        assert!(storage.last_activity().is_none());
        assert!(storage.credentials().is_none());
    }
}
