//! # tollgate-session — Session Store & Token Service
//!
//! The stateful half of Tollgate's authentication model. A session record
//! maps a subject to the single token currently accepted for it:
//!
//! ```text
//! login:token:<subject>  →  <token string>      (TTL = token lifetime)
//! ```
//!
//! Issuing a token overwrites the record, which implicitly revokes every
//! earlier token for that subject. Logging out deletes it. The store
//! enforces the TTL itself, so an expired record reads as absent.
//!
//! ## Backends
//!
//! - [`MemorySessionStore`]: process-local, for tests and single-node
//!   development.
//! - [`RedisSessionStore`]: shared store reachable over the network. Every
//!   call is bounded by a timeout; a timeout is a store failure, never
//!   "revoked".
//!
//! Mutation is last-writer-wins per key. No application-level locking is
//! performed across subjects or across the encode/put pair in
//! [`TokenService::issue`].

pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod service;
pub mod store;

pub use error::SessionError;
pub use keys::{session_key, SESSION_KEY_PREFIX};
pub use memory::MemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use service::{IssuedToken, TokenService, TokenServiceError};
pub use store::SessionStore;
