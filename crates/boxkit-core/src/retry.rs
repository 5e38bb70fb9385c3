//! Retry policy for API calls.

use std::fmt;
use std::time::Duration;

use rand::Rng;

use crate::fetch::{FetchOptions, FetchResponse};

/// Decides whether a finished attempt should be replayed, and after how long.
///
/// `attempt` is 1-based. For transport failures (status 0) it counts only the
/// failed-before-response attempts.
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    fn should_retry(&self, options: &FetchOptions, response: &FetchResponse, attempt: u32) -> bool;

    fn retry_after(&self, options: &FetchOptions, response: &FetchResponse, attempt: u32) -> Duration;
}

/// The Box API retry policy.
///
/// Retries 202-with-`Retry-After`, 429, 5xx, and 401 on authenticated calls
/// (after a token refresh). Waits for `Retry-After` when the server sends it,
/// otherwise uses randomized exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxRetryStrategy {
    pub max_attempts: u32,
    pub retry_randomization_factor: f64,
    pub retry_base_interval: Duration,
    pub max_retries_on_exception: u32,
}

impl Default for BoxRetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_randomization_factor: 0.5,
            retry_base_interval: Duration::from_secs(1),
            max_retries_on_exception: 2,
        }
    }
}

impl BoxRetryStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub const fn with_base_interval(mut self, interval: Duration) -> Self {
        self.retry_base_interval = interval;
        self
    }

    /// Jitter factor in `[0, 1)`; values outside are clamped.
    #[must_use]
    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.retry_randomization_factor = factor.clamp(0.0, 0.99);
        self
    }

    #[must_use]
    pub const fn with_max_retries_on_exception(mut self, retries: u32) -> Self {
        self.max_retries_on_exception = retries;
        self
    }

    /// Parse a `Retry-After` header given in (possibly fractional) seconds.
    fn parse_retry_after(value: &str) -> Option<Duration> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

impl RetryStrategy for BoxRetryStrategy {
    fn should_retry(&self, options: &FetchOptions, response: &FetchResponse, attempt: u32) -> bool {
        if response.status == 0 {
            return attempt <= self.max_retries_on_exception;
        }
        if attempt >= self.max_attempts {
            return false;
        }

        match response.status {
            202 => response.header("Retry-After").is_some(),
            429 => true,
            401 => options.authenticated,
            status => status >= 500,
        }
    }

    fn retry_after(&self, _options: &FetchOptions, response: &FetchResponse, attempt: u32) -> Duration {
        if let Some(delay) = response.header("Retry-After").and_then(Self::parse_retry_after) {
            return delay;
        }

        let factor = self.retry_randomization_factor;
        let randomization = rand::thread_rng().gen_range((1.0 - factor)..=(1.0 + factor));
        let exponential = 2f64.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let secs = exponential * self.retry_base_interval.as_secs_f64() * randomization;

        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn options() -> FetchOptions {
        FetchOptions::get("https://api.box.com/2.0/users/me")
    }

    fn response(status: u16, retry_after: Option<&str>) -> FetchResponse {
        let mut headers = BTreeMap::new();
        if let Some(value) = retry_after {
            headers.insert("Retry-After".to_string(), value.to_string());
        }
        FetchResponse {
            url: "https://api.box.com/2.0/users/me".to_string(),
            status,
            headers,
            ..Default::default()
        }
    }

    #[test]
    fn test_retryable_statuses() {
        let strategy = BoxRetryStrategy::default();
        assert!(strategy.should_retry(&options(), &response(429, None), 1));
        assert!(strategy.should_retry(&options(), &response(500, None), 1));
        assert!(strategy.should_retry(&options(), &response(503, None), 4));
        assert!(strategy.should_retry(&options(), &response(202, Some("2")), 1));
        assert!(strategy.should_retry(&options(), &response(401, None), 1));
    }

    #[test]
    fn test_non_retryable_statuses() {
        let strategy = BoxRetryStrategy::default();
        assert!(!strategy.should_retry(&options(), &response(200, None), 1));
        assert!(!strategy.should_retry(&options(), &response(202, None), 1));
        assert!(!strategy.should_retry(&options(), &response(404, None), 1));
        assert!(!strategy.should_retry(&options(), &response(409, None), 1));
        assert!(!strategy.should_retry(&options().unauthenticated(), &response(401, None), 1));
    }

    #[test]
    fn test_attempt_limit() {
        let strategy = BoxRetryStrategy::default().with_max_attempts(3);
        assert!(strategy.should_retry(&options(), &response(500, None), 2));
        assert!(!strategy.should_retry(&options(), &response(500, None), 3));
    }

    #[test]
    fn test_transport_failures_use_exception_budget() {
        let strategy = BoxRetryStrategy::default();
        let failure = FetchResponse::transport_failure("https://api.box.com");
        assert!(strategy.should_retry(&options(), &failure, 1));
        assert!(strategy.should_retry(&options(), &failure, 2));
        assert!(!strategy.should_retry(&options(), &failure, 3));
    }

    #[test]
    fn test_retry_after_header_wins() {
        let strategy = BoxRetryStrategy::default();
        assert_eq!(
            strategy.retry_after(&options(), &response(429, Some("3")), 1),
            Duration::from_secs(3)
        );
        assert_eq!(
            strategy.retry_after(&options(), &response(429, Some("0.5")), 1),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_exponential_backoff_bounds() {
        let strategy = BoxRetryStrategy::default();
        for attempt in 1..=4 {
            let delay = strategy.retry_after(&options(), &response(500, None), attempt);
            let nominal = 2f64.powi(attempt as i32);
            assert!(delay.as_secs_f64() >= nominal * 0.5, "attempt {attempt}: {delay:?}");
            assert!(delay.as_secs_f64() <= nominal * 1.5, "attempt {attempt}: {delay:?}");
        }
    }

    #[test]
    fn test_unparseable_header_falls_back_to_backoff() {
        let strategy = BoxRetryStrategy::default().with_randomization_factor(0.0);
        let delay = strategy.retry_after(&options(), &response(429, Some("Wed, 21 Oct 2015 07:28:00 GMT")), 2);
        assert_eq!(delay, Duration::from_secs(4));
    }
}
