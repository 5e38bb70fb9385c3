//! Public configuration for the Box client.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use boxkit_core::{
    Authentication, BaseUrls, BoxError, BoxResult, BoxRetryStrategy, RateLimitConfig, RateLimiter,
};
use boxkit_net::{
    Network, NetworkSession, ProxyConfig, TransportConfig, DEFAULT_TIMEOUT, USER_AGENT,
};

/// Configuration for a [`BoxClient`](crate::BoxClient).
///
/// # Example
///
/// ```
/// use boxkit_client::BoxClientConfig;
/// use std::time::Duration;
///
/// let config = BoxClientConfig::new()
///     .with_timeout(Duration::from_secs(30))
///     .with_max_attempts(3)
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct BoxClientConfig {
    pub(crate) base_urls: BaseUrls,
    pub(crate) user_agent: String,
    pub(crate) timeout: Duration,
    pub(crate) max_attempts: u32,
    pub(crate) retry_base_interval: Duration,
    pub(crate) max_retries_on_exception: u32,
    pub(crate) rate_limit: Option<RateLimitConfig>,
    pub(crate) proxy: Option<ProxyConfig>,
    pub(crate) additional_headers: BTreeMap<String, String>,
}

impl Default for BoxClientConfig {
    fn default() -> Self {
        let retry = BoxRetryStrategy::default();
        Self {
            base_urls: BaseUrls::default(),
            user_agent: USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: retry.max_attempts,
            retry_base_interval: retry.retry_base_interval,
            max_retries_on_exception: retry.max_retries_on_exception,
            rate_limit: None,
            proxy: None,
            additional_headers: BTreeMap::new(),
        }
    }
}

impl BoxClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `BOX_*` environment variables.
    ///
    /// | variable | meaning |
    /// |----------|---------|
    /// | `BOX_API_BASE_URL` | API host |
    /// | `BOX_UPLOAD_URL` | upload host |
    /// | `BOX_PROXY_URL` | proxy URL |
    /// | `BOX_MAX_ATTEMPTS` | retry attempt limit |
    /// | `BOX_RATE_LIMIT` | `calls/seconds`, e.g. `10/1` |
    pub fn from_env() -> BoxResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BoxResult<Self> {
        let mut config = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = value("BOX_API_BASE_URL") {
            config.base_urls.base_url = url;
        }
        if let Some(url) = value("BOX_UPLOAD_URL") {
            config.base_urls.upload_url = url;
        }
        if let Some(url) = value("BOX_PROXY_URL") {
            config.proxy = Some(ProxyConfig::new(url));
        }
        if let Some(raw) = value("BOX_MAX_ATTEMPTS") {
            config.max_attempts = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .ok_or_else(|| {
                    BoxError::configuration(format!(
                        "BOX_MAX_ATTEMPTS must be a positive integer, got '{raw}'"
                    ))
                })?;
        }
        if let Some(raw) = value("BOX_RATE_LIMIT") {
            config.rate_limit = Some(parse_rate_limit(&raw)?);
        }
        Ok(config)
    }

    /// Point the client at different hosts, e.g. a mock server.
    #[must_use]
    pub fn with_base_urls(mut self, base_urls: BaseUrls) -> Self {
        self.base_urls = base_urls;
        self
    }

    /// Set only the API host.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_urls.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout.
    ///
    /// Defaults to 60 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Defaults to 5.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Base of the exponential backoff.
    ///
    /// Defaults to 1 second.
    #[must_use]
    pub const fn with_retry_base_interval(mut self, interval: Duration) -> Self {
        self.retry_base_interval = interval;
        self
    }

    /// How many times a call that got no response is replayed.
    ///
    /// Defaults to 2.
    #[must_use]
    pub const fn with_max_retries_on_exception(mut self, retries: u32) -> Self {
        self.max_retries_on_exception = retries;
        self
    }

    /// Throttle outbound calls. Off by default.
    #[must_use]
    pub const fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Headers sent on every call.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.insert(name.into(), value.into());
        self
    }

    pub const fn base_urls(&self) -> &BaseUrls {
        &self.base_urls
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn rate_limit(&self) -> Option<&RateLimitConfig> {
        self.rate_limit.as_ref()
    }

    pub const fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    /// Build the network layer this configuration describes.
    ///
    /// Uses the shared transport unless the timeout or proxy differ from the
    /// defaults.
    pub(crate) fn build_network(&self, auth: Option<Arc<dyn Authentication>>) -> BoxResult<Network> {
        let transport = TransportConfig {
            timeout: self.timeout,
            ..TransportConfig::default()
        };
        let mut session = NetworkSession::new()?;
        if transport != TransportConfig::default() {
            session = session.with_transport_config(transport)?;
        }
        if let Some(ref proxy) = self.proxy {
            session = session.with_proxy(proxy)?;
        }
        session = self.configure(session)?;

        let network = Network::new(session);
        Ok(match auth {
            Some(auth) => network.with_auth(auth),
            None => network,
        })
    }

    /// Apply everything but the transport to `session`.
    pub(crate) fn configure(&self, session: NetworkSession) -> BoxResult<NetworkSession> {
        let retry = BoxRetryStrategy::default()
            .with_max_attempts(self.max_attempts)
            .with_base_interval(self.retry_base_interval)
            .with_max_retries_on_exception(self.max_retries_on_exception);

        let mut session = session
            .with_custom_base_urls(self.base_urls.clone())
            .with_user_agent(self.user_agent.clone())
            .with_retry_strategy(Arc::new(retry))
            .with_additional_headers(self.additional_headers.clone());

        if let Some(ref rate_limit) = self.rate_limit {
            session = session.with_rate_limiter(Arc::new(RateLimiter::new(rate_limit.clone())?));
        }
        Ok(session)
    }
}

/// Parse `calls/seconds` (seconds may be fractional).
fn parse_rate_limit(raw: &str) -> BoxResult<RateLimitConfig> {
    let invalid = || {
        BoxError::configuration(format!(
            "BOX_RATE_LIMIT must look like 'calls/seconds' (e.g. '10/1'), got '{raw}'"
        ))
    };

    let (calls, seconds) = raw.split_once('/').ok_or_else(invalid)?;
    let calls: usize = calls.trim().parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.trim().parse().map_err(|_| invalid())?;
    let window = Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|window| !window.is_zero())
        .ok_or_else(invalid)?;

    Ok(RateLimitConfig::new(calls, window))
}
