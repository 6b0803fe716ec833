//! # API Route Modules
//!
//! - `auth`: login, logout and registration (exempt from the gate).
//! - `account`: routes that require an authenticated caller (`/me`,
//!   `/admin/data`).

pub mod account;
pub mod auth;
