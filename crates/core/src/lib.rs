//! Tollgate domain core.
//!
//! Pure authentication primitives with no HTTP or SQL knowledge: signed
//! session tokens, the session lifecycle, CSRF double-submit checks, the
//! fixed-window rate limiter, one-time token rules, input validation and
//! payment webhook events.
//! Persistence is reached only through the [`store::TokenStore`] contract.

pub mod csrf;
pub mod error;
pub mod hashing;
pub mod one_time;
pub mod rate_limit;
pub mod session;
pub mod store;
pub mod token;
pub mod types;
pub mod validation;
pub mod webhook;
