//! Hourly eviction of aged rate-limit windows.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tollgate_core::rate_limit::RateLimiter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Sweep every limiter in `limiters` once per interval until `cancel` fires.
pub async fn run(limiters: Vec<Arc<RateLimiter>>, cancel: CancellationToken) {
    tracing::info!(
        limiters = limiters.len(),
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Rate limiter sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate limiter sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let removed: usize = limiters.iter().map(|l| l.sweep()).sum();
                tracing::debug!(removed, "Rate limiter sweep: evicted idle keys");
            }
        }
    }
}
