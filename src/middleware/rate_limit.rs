//! Rate limiting middleware
//!
//! Fixed-window request counting per (client IP, route path). Each key owns a
//! window that opens on its first request and closes `window_ms` later; the
//! request that pushes the count past `max_requests` is rejected with 429
//! until the window rolls over.
//!
//! Fixed windows allow a burst of up to twice the budget across a window
//! boundary. Routes that need a tighter bound should lower `max_requests`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, error, warn};
use validator::{Validate, ValidationErrors};

use super::request::{client_ip, request_path};
use crate::utils::AppError;

const DEFAULT_MESSAGE: &str = "Too many requests, please try again later.";

/// Per-route rate limit
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    #[validate(range(min = 1))]
    pub max_requests: u32,
    /// Window length in milliseconds
    #[validate(range(min = 1))]
    pub window_ms: u64,
    /// Message returned with 429 responses
    pub message: Option<String>,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_ms: u64) -> Result<Self, ValidationErrors> {
        let config = Self {
            max_requests,
            window_ms,
            message: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_MESSAGE)
    }
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Epoch milliseconds at which the current window closes
    pub reset_at: i64,
    /// Requests seen in the current window, this one included
    pub count: u32,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    reset_at: i64,
}

impl WindowState {
    fn open(now_ms: i64, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_at: now_ms.saturating_add(i64::try_from(window_ms).unwrap_or(i64::MAX)),
        }
    }
}

/// Build the counter key for a client and route
pub fn rate_limit_key(ip: &str, route: &str) -> String {
    format!("api:{}:{}", ip, route)
}

/// Seconds a rejected client should wait, rounded up
pub fn retry_after_secs(reset_at: i64, now_ms: i64) -> u64 {
    let remaining = u64::try_from(reset_at.saturating_sub(now_ms)).unwrap_or(0);
    remaining.div_ceil(1000)
}

/// Shared fixed-window counters
///
/// The read-increment-compare sequence for a key runs under one lock, so
/// concurrent requests can never both observe the same pre-increment count.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, WindowState>>>,
    max_tracked_keys: usize,
}

impl RateLimiter {
    pub fn new(max_tracked_keys: usize) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_tracked_keys,
        }
    }

    /// Count a request against `key` at the given instant
    ///
    /// Fails only when the counter store itself is unusable.
    pub fn check_at(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now_ms: i64,
    ) -> Result<RateLimitResult> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| anyhow!("rate limit counter store is poisoned"))?;

        if let Some(state) = windows.get_mut(key) {
            if now_ms < state.reset_at {
                state.count = state.count.saturating_add(1);
                return Ok(RateLimitResult {
                    allowed: state.count <= config.max_requests,
                    reset_at: state.reset_at,
                    count: state.count,
                });
            }
        } else if windows.len() >= self.max_tracked_keys {
            windows.retain(|_, state| now_ms < state.reset_at);
            if windows.len() >= self.max_tracked_keys {
                warn!(
                    tracked = windows.len(),
                    "Rate limiter is tracking more keys than its configured cap"
                );
            }
        }

        let state = WindowState::open(now_ms, config.window_ms);
        windows.insert(key.to_string(), state);

        Ok(RateLimitResult {
            allowed: true,
            reset_at: state.reset_at,
            count: state.count,
        })
    }

    /// Count a request against `key` now
    pub fn check(&self, key: &str, config: &RateLimitConfig) -> Result<RateLimitResult> {
        self.check_at(key, config, Utc::now().timestamp_millis())
    }

    /// Drop windows that closed before `now_ms`, returning how many went
    pub fn evict_expired_at(&self, now_ms: i64) -> usize {
        let Ok(mut windows) = self.windows.lock() else {
            return 0;
        };
        let before = windows.len();
        windows.retain(|_, state| now_ms < state.reset_at);
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

/// Layer state for one route's rate-limit guard
#[derive(Clone)]
pub struct RateLimitGuard {
    pub limiter: RateLimiter,
    pub config: RateLimitConfig,
    /// What to do when the counter store fails: allow (true) or deny (false)
    pub fail_open: bool,
}

/// Rate limiting middleware for Axum
pub async fn rate_limit_middleware(
    State(guard): State<RateLimitGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    let route = request_path(&request);
    let key = rate_limit_key(&ip, &route);
    let now_ms = Utc::now().timestamp_millis();

    match guard.limiter.check_at(&key, &guard.config, now_ms) {
        Ok(result) if result.allowed => {
            debug!(ip = %ip, route = %route, count = result.count, "Rate limit check passed");
            Ok(next.run(request).await)
        }
        Ok(result) => {
            warn!(ip = %ip, route = %route, count = result.count, "Rate limit exceeded");
            Err(AppError::RateLimitExceeded {
                message: guard.config.message().to_string(),
                retry_after_secs: retry_after_secs(result.reset_at, now_ms),
                limit: guard.config.max_requests,
            })
        }
        Err(e) if guard.fail_open => {
            error!(error = %e, route = %route, "Rate limit store unavailable, failing open");
            Ok(next.run(request).await)
        }
        Err(e) => {
            error!(error = %e, route = %route, "Rate limit store unavailable, failing closed");
            Err(AppError::ServiceUnavailable(
                "rate limit store unavailable".to_string(),
            ))
        }
    }
}

/// Spawn a background task to periodically evict closed windows
pub fn spawn_rate_limit_cleanup(limiter: RateLimiter, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let evicted = limiter.evict_expired_at(Utc::now().timestamp_millis());
            if evicted > 0 {
                debug!(
                    evicted,
                    remaining = limiter.tracked_keys(),
                    "Rate limiter cleanup"
                );
            }
        }
    });
}
