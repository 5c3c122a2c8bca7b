//! Repository for the `email_verification_tokens` table.

use sqlx::PgPool;
use tollgate_core::one_time::{check_redeemable, OneTimeTokenError};
use tollgate_core::types::{DbId, Timestamp};

use crate::error::RedeemError;
use crate::models::one_time::EmailVerificationToken;

const COLUMNS: &str = "token, user_id, email, expires_at, used_at, created_at";

pub struct EmailVerificationRepo;

impl EmailVerificationRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        email: &str,
        token: &str,
        expires_at: Timestamp,
    ) -> Result<EmailVerificationToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_verification_tokens (token, user_id, email, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmailVerificationToken>(&query)
            .bind(token)
            .bind(user_id)
            .bind(email)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Consume `token` and mark the owner's email verified in one transaction.
    ///
    /// A user whose email is already verified gets `Ok` without the token
    /// being checked. The token only verifies the address it was sent to.
    pub async fn redeem(pool: &PgPool, token: &str, now: Timestamp) -> Result<DbId, RedeemError> {
        let mut tx = pool.begin().await?;

        let query =
            format!("SELECT {COLUMNS} FROM email_verification_tokens WHERE token = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, EmailVerificationToken>(&query)
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(OneTimeTokenError::NotFound)?;

        let verified: Option<(bool,)> =
            sqlx::query_as("SELECT email_verified FROM users WHERE id = $1")
                .bind(row.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        match verified {
            None => return Err(OneTimeTokenError::NotFound.into()),
            Some((true,)) => return Ok(row.user_id),
            Some((false,)) => {}
        }

        check_redeemable(row.expires_at, row.used_at, now)?;

        sqlx::query("UPDATE email_verification_tokens SET used_at = $2 WHERE token = $1")
            .bind(&row.token)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            "UPDATE users SET email_verified = true, updated_at = NOW()
             WHERE id = $1 AND email = $2",
        )
        .bind(row.user_id)
        .bind(&row.email)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(OneTimeTokenError::NotFound.into());
        }

        tx.commit().await?;
        Ok(row.user_id)
    }

    /// Delete expired tokens. Returns the count deleted.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_verification_tokens WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
