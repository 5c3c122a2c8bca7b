//! Single-use, time-limited tokens (password reset, email verification).
//!
//! A token may be redeemed exactly once and only before it expires. Callers
//! must mark it used in the same transaction that applies its effect.

use chrono::Duration;
use uuid::Uuid;

use crate::types::Timestamp;

/// Password reset tokens expire after 1 hour.
pub const PASSWORD_RESET_TTL_SECS: i64 = 60 * 60;
/// Email verification tokens expire after 24 hours.
pub const EMAIL_VERIFICATION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OneTimeTokenError {
    #[error("token not found")]
    NotFound,

    #[error("token has already been used")]
    AlreadyUsed,

    #[error("token has expired")]
    Expired,
}

/// Generate a new one-time token value.
pub fn generate_one_time_token() -> String {
    Uuid::new_v4().to_string()
}

/// Whether `token` has the shape of a generated token.
pub fn is_well_formed(token: &str) -> bool {
    Uuid::parse_str(token).is_ok()
}

/// Expiry for a token of the given lifetime issued at `now`.
pub fn expires_at(now: Timestamp, ttl_secs: i64) -> Timestamp {
    now + Duration::seconds(ttl_secs)
}

/// Decide whether a stored token can still be redeemed at `now`.
///
/// A used token is reported as used even if it has also expired.
pub fn check_redeemable(
    expires_at: Timestamp,
    used_at: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), OneTimeTokenError> {
    if used_at.is_some() {
        return Err(OneTimeTokenError::AlreadyUsed);
    }
    if expires_at <= now {
        return Err(OneTimeTokenError::Expired);
    }
    Ok(())
}
