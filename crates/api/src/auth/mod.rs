//! Authentication primitives for the HTTP layer.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`cookies`] -- Session cookie construction and parsing.

pub mod cookies;
pub mod password;
