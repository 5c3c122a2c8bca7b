//! Repository for the `password_reset_tokens` table.

use sqlx::PgPool;
use tollgate_core::one_time::{check_redeemable, OneTimeTokenError};
use tollgate_core::types::{DbId, Timestamp};

use crate::error::RedeemError;
use crate::models::one_time::PasswordResetToken;

const COLUMNS: &str = "id, user_id, token, expires_at, used_at, created_at";

pub struct PasswordResetRepo;

impl PasswordResetRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        token: &str,
        expires_at: Timestamp,
    ) -> Result<PasswordResetToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PasswordResetToken>(&query)
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Consume `token` and set the owner's password hash in one transaction.
    ///
    /// The token row is locked for the duration, so two concurrent
    /// redemptions cannot both succeed. Returns the owning user's id.
    pub async fn redeem(
        pool: &PgPool,
        token: &str,
        password_hash: &str,
        now: Timestamp,
    ) -> Result<DbId, RedeemError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM password_reset_tokens WHERE token = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, PasswordResetToken>(&query)
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(OneTimeTokenError::NotFound)?;

        check_redeemable(row.expires_at, row.used_at, now)?;

        sqlx::query("UPDATE password_reset_tokens SET used_at = $2 WHERE id = $1")
            .bind(row.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let updated =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(row.user_id)
                .bind(password_hash)
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
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
