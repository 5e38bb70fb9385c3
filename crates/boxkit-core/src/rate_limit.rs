//! Outbound call throttling.
//!
//! A sliding-window limiter: every successful acquisition records its
//! timestamp in a bounded queue, and timestamps older than the window are
//! evicted from the front before each check. Callers that find the window
//! full poll until the oldest timestamp ages out.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{BoxError, BoxResult};

/// Configuration for a [`RateLimiter`].
///
/// # Example
///
/// ```
/// use boxkit_core::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::new(16, Duration::from_secs(1))
///     .with_poll_interval(Duration::from_millis(5));
/// assert_eq!(config.max_calls(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    max_calls: usize,
    window: Duration,
    poll_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 10,
            window: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl RateLimitConfig {
    /// Allow `max_calls` calls in any `window`-long interval.
    #[must_use]
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            ..Self::default()
        }
    }

    /// How long a blocked caller sleeps between checks.
    ///
    /// Defaults to 10ms.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub const fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Sliding-window rate limiter, shareable across threads and tasks.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter. A `max_calls` of zero is rejected.
    pub fn new(config: RateLimitConfig) -> BoxResult<Self> {
        if config.max_calls == 0 {
            return Err(BoxError::RateLimit {
                message: "max_calls must be at least 1".to_string(),
            });
        }

        Ok(Self {
            timestamps: Mutex::new(VecDeque::with_capacity(config.max_calls)),
            config,
        })
    }

    /// Convenience constructor for `max_calls` per second.
    pub fn per_second(max_calls: usize) -> BoxResult<Self> {
        Self::new(RateLimitConfig::new(max_calls, Duration::from_secs(1)))
    }

    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn evict_expired(&self, queue: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = queue.front() {
            if now.duration_since(oldest) >= self.config.window {
                queue.pop_front();
            } else {
                break;
            }
        }
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut queue = self.timestamps.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_expired(&mut queue, now);

        if queue.len() < self.config.max_calls {
            queue.push_back(now);
            true
        } else {
            false
        }
    }

    /// How long until a slot frees up. Zero when one is free now.
    pub fn time_until_available(&self) -> Duration {
        let now = Instant::now();
        let mut queue = self.timestamps.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_expired(&mut queue, now);

        if queue.len() < self.config.max_calls {
            return Duration::ZERO;
        }
        queue.front().map_or(Duration::ZERO, |oldest| {
            self.config.window.saturating_sub(now.duration_since(*oldest))
        })
    }

    /// Number of calls currently counted against the window.
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        let mut queue = self.timestamps.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_expired(&mut queue, now);
        queue.len()
    }

    /// Forget every recorded call.
    pub fn reset(&self) {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Block the current thread until a slot is free, then take it.
    ///
    /// Returns how long the caller waited.
    pub fn acquire(&self) -> Duration {
        let started = Instant::now();
        let mut logged = false;

        while !self.try_acquire() {
            if !logged {
                debug!(
                    max_calls = self.config.max_calls,
                    window_ms = self.config.window.as_millis(),
                    "Rate limit reached, waiting for a free slot"
                );
                logged = true;
            }
            std::thread::sleep(self.config.poll_interval);
        }

        started.elapsed()
    }

    /// Async variant of [`acquire`](Self::acquire); yields to the runtime
    /// between polls instead of blocking the thread.
    pub async fn acquire_async(&self) -> Duration {
        let started = Instant::now();
        let mut logged = false;

        while !self.try_acquire() {
            if !logged {
                debug!(
                    max_calls = self.config.max_calls,
                    window_ms = self.config.window.as_millis(),
                    "Rate limit reached, waiting for a free slot"
                );
                logged = true;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        started.elapsed()
    }
}
