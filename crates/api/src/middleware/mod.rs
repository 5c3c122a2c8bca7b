//! Request guards.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from the access token.
//! - [`rate_limit::enforce`] -- Fixed-window limiting keyed by client address.
//! - [`csrf::require_csrf`] -- Double-submit CSRF check.
//! - [`client`] -- Client address and device helpers.

pub mod auth;
pub mod client;
pub mod csrf;
pub mod rate_limit;
