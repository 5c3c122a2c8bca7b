//! Repository for the `users` table.

use sqlx::PgPool;
use tollgate_core::types::DbId;

use crate::models::user::{
    CreateUser, SubscriptionStatus, UpdateProfile, UpdateSubscription, User,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, name, password_hash, email_verified, latest_status, \
                        latest_product_id, latest_variant_id, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, name, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.name)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-sensitive; callers normalize first).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Update profile fields. Changing the email clears `email_verified`.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProfile,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                email_verified = CASE
                    WHEN $3::TEXT IS NOT NULL AND $3 <> email THEN false
                    ELSE email_verified
                END,
                email = COALESCE($3, email),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .fetch_optional(pool)
            .await
    }

    /// Replace the stored password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the user's latest subscription fields. Returns `false` if no
    /// row with the given `id` exists.
    pub async fn update_subscription(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSubscription,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET
                latest_status = $2,
                latest_product_id = $3,
                latest_variant_id = $4,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.status)
        .bind(input.product_id)
        .bind(input.variant_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Read the user's latest subscription fields.
    pub async fn subscription_status(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SubscriptionStatus>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionStatus>(
            "SELECT latest_status, latest_product_id, latest_variant_id FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
