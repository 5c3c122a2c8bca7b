//! Short-lived cache of per-user subscription status.
//!
//! Entries live for [`SUBSCRIPTION_CACHE_TTL`]. Expired entries are ignored on
//! read and removed by [`SubscriptionCache::sweep`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tollgate_core::types::UserId;
use tollgate_db::models::user::SubscriptionStatus;

/// How long a cached status is served.
pub const SUBSCRIPTION_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on a cache-miss lookup before the caller gets a timeout.
pub const SUBSCRIPTION_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SubscriptionCache {
    ttl: Duration,
    entries: RwLock<HashMap<UserId, (SubscriptionStatus, Instant)>>,
}

impl Default for SubscriptionCache {
    fn default() -> Self {
        Self::new(SUBSCRIPTION_CACHE_TTL)
    }
}

impl SubscriptionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: UserId) -> Option<SubscriptionStatus> {
        self.get_at(user_id, Instant::now()).await
    }

    pub async fn get_at(&self, user_id: UserId, now: Instant) -> Option<SubscriptionStatus> {
        let entries = self.entries.read().await;
        let (status, stored_at) = entries.get(&user_id)?;
        (now.saturating_duration_since(*stored_at) < self.ttl).then(|| status.clone())
    }

    pub async fn put(&self, user_id: UserId, status: SubscriptionStatus) {
        self.put_at(user_id, status, Instant::now()).await;
    }

    pub async fn put_at(&self, user_id: UserId, status: SubscriptionStatus, now: Instant) {
        self.entries.write().await.insert(user_id, (status, now));
    }

    pub async fn invalidate(&self, user_id: UserId) {
        self.entries.write().await.remove(&user_id);
    }

    /// Entries held, including expired ones not yet swept.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    /// Remove expired entries. Returns the number removed.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, stored_at)| now.saturating_duration_since(*stored_at) < self.ttl);
        before - entries.len()
    }
}
