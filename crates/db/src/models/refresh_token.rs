//! Refresh-token rows.

use sqlx::FromRow;
use tollgate_core::store::RefreshTokenRecord;
use tollgate_core::types::{DbId, Timestamp};

/// A row from the `refresh_tokens` table.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub device_info: String,
    pub ip_address: String,
    pub is_blocked: bool,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

impl From<RefreshToken> for RefreshTokenRecord {
    fn from(row: RefreshToken) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            device_info: row.device_info,
            ip_address: row.ip_address,
            is_blocked: row.is_blocked,
            expires_at: row.expires_at,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        }
    }
}
