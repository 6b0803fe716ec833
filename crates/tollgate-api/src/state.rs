//! # Application State
//!
//! Shared state for the Axum application, passed to route handlers via the
//! `State` extractor. Every field is either `Arc`-backed or cheap to clone.
//!
//! - **tokens**: issues and revokes session-bound tokens.
//! - **gate**: the authentication gate, sharing the same codec and store.
//! - **users** / **passwords**: account collaborators for login and
//!   registration.

use std::sync::Arc;

use tollgate_core::{TokenCodec, TokenError};
use tollgate_session::{MemorySessionStore, SessionStore, TokenService};

use crate::auth::{AuthGate, GatePolicy};
use crate::config::AppConfig;
use crate::password::{BcryptHasher, PasswordHasher};
use crate::users::{InMemoryUserStore, UserStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub gate: AuthGate,
    pub users: Arc<dyn UserStore>,
    pub passwords: Arc<dyn PasswordHasher>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the codec, gate and token service around the given collaborators.
    pub fn new(
        config: AppConfig,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        passwords: Arc<dyn PasswordHasher>,
    ) -> Result<Self, TokenError> {
        let codec = Arc::new(TokenCodec::new(&config.signing_secret, config.token_lifetime)?);
        let gate = AuthGate::new(
            Arc::clone(&codec),
            Arc::clone(&sessions),
            GatePolicy::new(&config.exempt_paths),
        );
        let tokens = TokenService::new(codec, sessions, config.session_ttl);

        Ok(Self {
            config: Arc::new(config),
            tokens,
            gate,
            users,
            passwords,
        })
    }

    /// Everything in memory: sessions, accounts. bcrypt cost from `config`.
    pub fn in_memory(config: AppConfig) -> Result<Self, TokenError> {
        let passwords = BcryptHasher::new(config.bcrypt_cost);
        Self::new(
            config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(passwords),
        )
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        self.tokens.store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tollgate_core::{Claims, SigningSecret};

    fn config() -> AppConfig {
        AppConfig::new(SigningSecret::new("state-test-secret-state-test-secret").unwrap())
    }

    #[tokio::test]
    async fn gate_and_service_share_store() {
        let state = AppState::in_memory(config()).unwrap();
        let issued = state.tokens.issue("alice", &Claims::new()).await.unwrap();
        assert_eq!(
            state.sessions().get("alice").await.unwrap(),
            Some(issued.token)
        );
    }

    #[test]
    fn zero_lifetime_rejected() {
        let mut config = config();
        config.token_lifetime = Duration::ZERO;
        assert!(AppState::in_memory(config).is_err());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let state = AppState::in_memory(config()).unwrap();
        let debug = format!("{state:?}");
        assert!(!debug.contains("state-test-secret"));
    }
}
