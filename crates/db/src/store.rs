//! PostgreSQL-backed [`TokenStore`].

use async_trait::async_trait;
use sqlx::PgPool;
use tollgate_core::store::{NewRefreshToken, RefreshTokenRecord, StoreError, TokenStore};
use tollgate_core::types::{Timestamp, UserId};

use crate::repositories::{BlacklistRepo, RefreshTokenRepo};

/// Stores refresh rows and blacklist entries in Postgres.
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn create_refresh_token(&self, input: NewRefreshToken) -> Result<(), StoreError> {
        RefreshTokenRepo::create(&self.pool, &input)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = RefreshTokenRepo::find_by_hash(&self.pool, token_hash)
            .await
            .map_err(StoreError::backend)?;
        Ok(row.map(Into::into))
    }

    async fn touch_refresh_token(&self, token_hash: &str) -> Result<(), StoreError> {
        RefreshTokenRepo::touch(&self.pool, token_hash)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn block_all_refresh_tokens(&self, user_id: UserId) -> Result<u64, StoreError> {
        RefreshTokenRepo::block_all_for_user(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)
    }

    async fn add_to_blacklist(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: Timestamp,
    ) -> Result<(), StoreError> {
        BlacklistRepo::add(&self.pool, jti, user_id, expires_at)
            .await
            .map_err(StoreError::backend)
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError> {
        BlacklistRepo::contains(&self.pool, jti)
            .await
            .map_err(StoreError::backend)
    }

    async fn delete_expired_blacklist_entries(&self) -> Result<u64, StoreError> {
        BlacklistRepo::delete_expired(&self.pool)
            .await
            .map_err(StoreError::backend)
    }

    async fn delete_expired_refresh_tokens(&self) -> Result<u64, StoreError> {
        RefreshTokenRepo::delete_expired(&self.pool)
            .await
            .map_err(StoreError::backend)
    }
}
