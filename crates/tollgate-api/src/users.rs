//! # User Store
//!
//! Account persistence consumed by the login and registration routes.
//! The Postgres implementation lives in [`crate::db::users`]; this module
//! holds the trait, the record type and the in-memory store used in
//! development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Role assigned to self-registered accounts.
pub const DEFAULT_ROLE: &str = "USER";
/// Role required by administrative routes.
pub const ADMIN_ROLE: &str = "ADMIN";

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    /// Disabled accounts cannot log in.
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// New enabled account with a fresh id.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            role: role.into(),
            enabled: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserStoreError {
    /// Username already registered.
    #[error("username '{0}' already exists")]
    Duplicate(String),

    #[error("user store backend error: {0}")]
    Backend(String),
}

/// Account lookup and creation.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserStoreError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, UserStoreError>;

    /// Insert a new account. Fails with [`UserStoreError::Duplicate`] if the
    /// username is taken.
    async fn save(&self, user: UserRecord) -> Result<(), UserStoreError>;
}

/// Process-local user store keyed by username.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, UserStoreError> {
        Ok(self.users.read().contains_key(username))
    }

    async fn save(&self, user: UserRecord) -> Result<(), UserStoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(UserStoreError::Duplicate(user.username));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }
}
