//! # In-Memory Session Store
//!
//! Process-local [`SessionStore`] backed by a `HashMap` behind a
//! [`parking_lot::RwLock`]. Expiry is evaluated lazily on read against
//! [`tokio::time::Instant`], so tests can drive it with paused time.
//!
//! Sessions are lost on restart and are not shared between instances.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::error::SessionError;
use crate::keys::session_key;
use crate::store::SessionStore;

#[derive(Debug, Clone)]
struct Entry {
    token: String,
    // `None` when the TTL overflows the clock: the entry never expires.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Whether there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries. Reads never return them either way; this only
    /// reclaims memory.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, subject: &str, token: &str, ttl: Duration) -> Result<(), SessionError> {
        let entry = Entry {
            token: token.to_string(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().insert(session_key(subject), entry);
        Ok(())
    }

    async fn get(&self, subject: &str) -> Result<Option<String>, SessionError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(&session_key(subject))
            .filter(|e| e.is_live(now))
            .map(|e| e.token.clone()))
    }

    async fn delete(&self, subject: &str) -> Result<(), SessionError> {
        self.entries.write().remove(&session_key(subject));
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
