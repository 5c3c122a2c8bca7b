//! Password-reset and email-verification token rows.

use sqlx::FromRow;
use tollgate_core::types::{DbId, Timestamp};

/// A row from `password_reset_tokens`.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: DbId,
    pub user_id: DbId,
    pub token: String,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A row from `email_verification_tokens`.
#[derive(Debug, Clone, FromRow)]
pub struct EmailVerificationToken {
    pub token: String,
    pub user_id: DbId,
    pub email: String,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
