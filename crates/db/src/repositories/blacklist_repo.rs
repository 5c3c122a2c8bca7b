//! Repository for the `token_blacklist` table.

use sqlx::PgPool;
use tollgate_core::types::{DbId, Timestamp};

pub struct BlacklistRepo;

impl BlacklistRepo {
    /// Record a revoked access-token id. Re-inserting the same id is a no-op.
    pub async fn add(
        pool: &PgPool,
        jti: &str,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO token_blacklist (jti, user_id, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether `jti` has a live (unexpired) blacklist entry.
    pub async fn contains(pool: &PgPool, jti: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM token_blacklist WHERE jti = $1 AND expires_at > NOW()
             )",
        )
        .bind(jti)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Delete entries whose token would have expired anyway.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
