use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{NewRefreshToken, RefreshTokenRecord, StoreError, TokenStore};
use crate::types::{DbId, Timestamp, UserId};

#[derive(Debug, Default)]
struct Inner {
    next_id: DbId,
    refresh: HashMap<String, RefreshTokenRecord>,
    blacklist: HashMap<String, (UserId, Timestamp)>,
}

/// In-process [`TokenStore`]. State is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Inner>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh rows held for `user_id`.
    pub async fn refresh_count(&self, user_id: UserId) -> usize {
        self.inner
            .read()
            .await
            .refresh
            .values()
            .filter(|r| r.user_id == user_id)
            .count()
    }

    /// Number of blacklist entries, expired ones included.
    pub async fn blacklist_len(&self) -> usize {
        self.inner.read().await.blacklist.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create_refresh_token(&self, input: NewRefreshToken) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let record = RefreshTokenRecord {
            id: inner.next_id,
            user_id: input.user_id,
            token_hash: input.token_hash.clone(),
            device_info: input.device_info,
            ip_address: input.ip_address,
            is_blocked: false,
            expires_at: input.expires_at,
            created_at: Utc::now(),
            last_used_at: None,
        };
        inner.refresh.insert(input.token_hash, record);
        Ok(())
    }

    async fn get_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.inner.read().await.refresh.get(token_hash).cloned())
    }

    async fn touch_refresh_token(&self, token_hash: &str) -> Result<(), StoreError> {
        if let Some(record) = self.inner.write().await.refresh.get_mut(token_hash) {
            record.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn block_all_refresh_tokens(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut blocked = 0;
        for record in inner.refresh.values_mut() {
            if record.user_id == user_id && !record.is_blocked {
                record.is_blocked = true;
                blocked += 1;
            }
        }
        Ok(blocked)
    }

    async fn add_to_blacklist(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .blacklist
            .entry(jti.to_string())
            .or_insert((user_id, expires_at));
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        Ok(self
            .inner
            .read()
            .await
            .blacklist
            .get(jti)
            .is_some_and(|(_, expires_at)| *expires_at > now))
    }

    async fn delete_expired_blacklist_entries(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let before = inner.blacklist.len();
        inner.blacklist.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - inner.blacklist.len()) as u64)
    }

    async fn delete_expired_refresh_tokens(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let before = inner.refresh.len();
        inner.refresh.retain(|_, r| r.expires_at > now);
        Ok((before - inner.refresh.len()) as u64)
    }
}
