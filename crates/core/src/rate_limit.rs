//! Fixed-window request counting per client key.
//!
//! Each key owns a window that starts with its first request. Requests inside
//! the window increment the count; once the count exceeds the limit the key is
//! refused until the window has fully elapsed, at which point the next request
//! opens a fresh window. All state sits behind a single mutex that is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A window length and the number of requests admitted inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub limit: u32,
}

impl RateLimitPolicy {
    /// Login, registration and password reset: 5 requests per minute.
    pub const AUTH: Self = Self {
        window: Duration::from_secs(60),
        limit: 5,
    };

    /// Unauthenticated endpoints outside the login flow: 5 requests per minute.
    pub const PUBLIC: Self = Self {
        window: Duration::from_secs(60),
        limit: 5,
    };

    /// Session refresh: 3 requests per 5 minutes.
    pub const REFRESH: Self = Self {
        window: Duration::from_secs(5 * 60),
        limit: 3,
    };
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Refused; the client may retry after `retry_after`.
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one request from `key` at instant `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        if now.saturating_duration_since(window.started_at) > self.policy.window {
            *window = Window {
                count: 0,
                started_at: now,
            };
        }

        window.count = window.count.saturating_add(1);
        if window.count > self.policy.limit {
            RateDecision::Limited {
                retry_after: self.policy.window,
            }
        } else {
            RateDecision::Allowed
        }
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Drop every key whose window has aged past the window length.
    ///
    /// Returns the number of keys removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = windows.len();
        let window_len = self.policy.window;
        windows.retain(|_, w| now.saturating_duration_since(w.started_at) <= window_len);
        before - windows.len()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
