//! # Redis Session Store
//!
//! [`SessionStore`] over a shared Redis instance using a multiplexed
//! [`ConnectionManager`], which reconnects on its own after transient
//! failures. Records are written with `SET key token PX <ttl>` so Redis owns
//! expiry.
//!
//! Every command runs under `tokio::time::timeout`. A timed-out call maps to
//! [`SessionError::Timeout`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;

use crate::error::SessionError;
use crate::keys::session_key;
use crate::store::SessionStore;

/// Redis-backed session store.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RedisSessionStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`). The initial
    /// connection attempt is bounded by `timeout` as well.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, SessionError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = bounded(timeout, ConnectionManager::new(client)).await?;
        tracing::info!(timeout_ms = timeout.as_millis() as u64, "connected to redis session store");
        Ok(Self { conn, timeout })
    }

    /// Per-command timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, subject: &str, token: &str, ttl: Duration) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        // PX 0 is rejected by Redis.
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let cmd = redis::cmd("SET")
            .arg(session_key(subject))
            .arg(token)
            .arg("PX")
            .arg(ttl_ms)
            .to_owned();
        bounded(self.timeout, cmd.query_async::<_, ()>(&mut conn)).await
    }

    async fn get(&self, subject: &str) -> Result<Option<String>, SessionError> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("GET").arg(session_key(subject)).to_owned();
        bounded(self.timeout, cmd.query_async::<_, Option<String>>(&mut conn)).await
    }

    async fn delete(&self, subject: &str) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("DEL").arg(session_key(subject)).to_owned();
        let removed: i64 = bounded(self.timeout, cmd.query_async(&mut conn)).await?;
        tracing::debug!(subject, removed, "session record deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("PING");
        let _: String = bounded(self.timeout, cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(unavailable),
        Err(_) => Err(SessionError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

fn unavailable(err: RedisError) -> SessionError {
    SessionError::Unavailable(err.to_string())
}
