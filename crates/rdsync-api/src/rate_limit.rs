//! Token bucket rate limiting for the remote API
//!
//! The service enforces separate per-minute quotas for general calls and for
//! adding torrents, so each client owns one [`RateLimiter`] per quota.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rdsync_api::rate_limit::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::per_minute(250);
//! limiter.acquire().await;
//! // ... make API call ...
//! # }
//! ```

use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

/// Slack for floating-point refill arithmetic
const EPSILON: f64 = 1e-9;

// ============================================================================
// RateLimiter
// ============================================================================

/// Internal mutable state, protected by the limiter's mutex.
#[derive(Debug)]
struct BucketState {
    /// Current number of available tokens (fractional for smooth refill)
    tokens: f64,
    /// Timestamp of the last refill calculation
    last_refill: Instant,
}

/// Token bucket allowing `capacity` calls per `period`.
///
/// Tokens refill continuously at `capacity / period` per second, capped at
/// `capacity`. The bucket starts full.
///
/// The mutex is held for the whole acquire, including any sleep, so
/// concurrent callers are served one at a time and can never both observe
/// the same stale token count.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum number of tokens in the bucket
    capacity: u32,
    /// Window the capacity applies to
    period: Duration,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Creates a limiter allowing `calls` acquisitions per `period`.
    ///
    /// # Arguments
    /// * `calls` - Bucket capacity; clamped to at least 1
    /// * `period` - Time for an empty bucket to refill completely
    pub fn new(calls: u32, period: Duration) -> Self {
        let capacity = calls.max(1);
        Self {
            capacity,
            period,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Creates a limiter allowing `calls` acquisitions per minute.
    pub fn per_minute(calls: u32) -> Self {
        Self::new(calls, Duration::from_secs(60))
    }

    /// Maximum number of tokens.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        let secs = self.period.as_secs_f64();
        if secs > 0.0 {
            self.capacity as f64 / secs
        } else {
            f64::INFINITY
        }
    }

    /// Tokens currently available, after refilling.
    pub async fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    /// Waits for one token and debits it.
    pub async fn acquire(&self) {
        self.acquire_many(1).await;
    }

    /// Waits until `n` tokens are available and debits them.
    ///
    /// Never fails and never times out. A request larger than the capacity is
    /// paid in installments: each time the bucket is full its whole content is
    /// debited, and the caller waits for the remainder to accrue.
    pub async fn acquire_many(&self, n: u32) {
        if n == 0 {
            return;
        }

        let mut state = self.state.lock().await;
        let capacity = self.capacity as f64;
        let mut owed = n as f64;

        loop {
            self.refill(&mut state);

            if state.tokens + EPSILON >= owed {
                state.tokens = (state.tokens - owed).max(0.0);
                return;
            }

            if owed > capacity && state.tokens + EPSILON >= capacity {
                owed -= state.tokens;
                state.tokens = 0.0;
            }

            let deficit = owed.min(capacity) - state.tokens;
            let wait = self.time_for(deficit);
            debug!(
                requested = n,
                available = state.tokens,
                wait_ms = wait.as_millis() as u64,
                "No tokens available, waiting for refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Adds tokens for the time elapsed since the last refill.
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            let added = elapsed * self.refill_rate();
            state.tokens = (state.tokens + added).min(self.capacity as f64);
            state.last_refill = now;
        }
    }

    /// Time needed to accrue `tokens` tokens.
    fn time_for(&self, tokens: f64) -> Duration {
        let per_token = self.period.as_secs_f64() / self.capacity as f64;
        Duration::from_secs_f64((tokens * per_token).max(0.0))
    }
}
