//! Hourly purge of expired credentials.
//!
//! Deletes expired blacklist entries, refresh tokens and one-time tokens, and
//! drops stale subscription cache entries.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tollgate_db::repositories::{EmailVerificationRepo, PasswordResetRepo};

use tollgate_core::session::SessionManager;

use crate::subscription_cache::SubscriptionCache;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the cleanup loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    sessions: Arc<SessionManager>,
    cache: Arc<SubscriptionCache>,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Token cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Token cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                run_once(&pool, &sessions, &cache).await;
            }
        }
    }
}

/// One cleanup pass. Each step logs its own failure and the pass continues.
pub async fn run_once(pool: &PgPool, sessions: &SessionManager, cache: &SubscriptionCache) {
    let store = sessions.store();

    match store.delete_expired_blacklist_entries().await {
        Ok(deleted) => log_purged("blacklist entries", deleted),
        Err(e) => tracing::error!(error = %e, "Token cleanup: blacklist purge failed"),
    }
    match store.delete_expired_refresh_tokens().await {
        Ok(deleted) => log_purged("refresh tokens", deleted),
        Err(e) => tracing::error!(error = %e, "Token cleanup: refresh token purge failed"),
    }
    match PasswordResetRepo::delete_expired(pool).await {
        Ok(deleted) => log_purged("password reset tokens", deleted),
        Err(e) => tracing::error!(error = %e, "Token cleanup: reset token purge failed"),
    }
    match EmailVerificationRepo::delete_expired(pool).await {
        Ok(deleted) => log_purged("verification tokens", deleted),
        Err(e) => tracing::error!(error = %e, "Token cleanup: verification token purge failed"),
    }

    let evicted = cache.sweep().await;
    if evicted > 0 {
        tracing::debug!(evicted, "Token cleanup: subscription cache swept");
    }
}

fn log_purged(what: &str, deleted: u64) {
    if deleted > 0 {
        tracing::info!(deleted, what, "Token cleanup: purged expired rows");
    } else {
        tracing::debug!(what, "Token cleanup: nothing to purge");
    }
}
