//! Persistence contract for session tokens.
//!
//! The session manager talks to storage only through [`TokenStore`]. The
//! production implementation lives in `tollgate-db`; [`MemoryTokenStore`]
//! backs unit tests and single-process embedding.

mod memory;

pub use memory::MemoryTokenStore;

use async_trait::async_trait;

use crate::types::{DbId, Timestamp, UserId};

/// Failure reported by a storage backend.
#[derive(Debug, thiserror::Error)]
#[error("token store error: {source}")]
pub struct StoreError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            source: Box::new(err),
        }
    }
}

/// A persisted refresh-token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: DbId,
    pub user_id: UserId,
    /// SHA-256 hex of the token's `jti`.
    pub token_hash: String,
    pub device_info: String,
    pub ip_address: String,
    pub is_blocked: bool,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

/// Input for [`TokenStore::create_refresh_token`].
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub token_hash: String,
    pub device_info: String,
    pub ip_address: String,
    pub expires_at: Timestamp,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create_refresh_token(&self, input: NewRefreshToken) -> Result<(), StoreError>;

    /// Look up a refresh row by hash, whatever its blocked or expiry state.
    async fn get_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Record that a refresh row was just used.
    async fn touch_refresh_token(&self, token_hash: &str) -> Result<(), StoreError>;

    /// Block every refresh row of `user_id`. Returns the number of rows blocked.
    async fn block_all_refresh_tokens(&self, user_id: UserId) -> Result<u64, StoreError>;

    /// Revoke an access token id until `expires_at`. Idempotent.
    async fn add_to_blacklist(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Whether `jti` is revoked and its entry has not yet expired.
    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError>;

    async fn delete_expired_blacklist_entries(&self) -> Result<u64, StoreError>;

    async fn delete_expired_refresh_tokens(&self) -> Result<u64, StoreError>;
}
