//! Request dispatch with rate limiting, auth and retries.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use boxkit_core::{
    ApiError, ApiRequest, Authentication, BoxError, BoxResult, FetchOptions, FetchResponse,
    RequestInfo, ResponseInfo, RetryStrategy, SingletonRegistry,
};
use tracing::{debug, info, warn};

use crate::error::NetError;
use crate::session::NetworkSession;

/// Value of the `User-Agent` header.
pub const USER_AGENT: &str = concat!("boxkit/", env!("CARGO_PKG_VERSION"));

/// Value of the `X-Box-UA` analytics header.
pub const X_BOX_UA: &str = concat!("agent=boxkit/", env!("CARGO_PKG_VERSION"), "; env=rust");

// ============================================================================
// Attempts and retry bookkeeping
// ============================================================================

/// One round trip: the prepared request and what came back.
struct Attempt {
    request: ApiRequest,
    response: FetchResponse,
    /// Set when the transport failed; `response` is then a status-0 placeholder
    transport_error: Option<String>,
}

/// Attempt counters for one logical call.
///
/// Responses are numbered by total attempts; transport failures by how many
/// of them happened so far.
#[derive(Debug, Default)]
struct RetryState {
    attempts: u32,
    transport_failures: u32,
}

impl RetryState {
    /// Count `attempt` and ask the strategy whether to replay it.
    ///
    /// Returns the delay and whether the replay must refresh the token.
    fn next_retry(
        &mut self,
        strategy: &dyn RetryStrategy,
        options: &FetchOptions,
        attempt: &Attempt,
    ) -> Option<(Duration, bool)> {
        self.attempts += 1;
        let number = if attempt.transport_error.is_some() {
            self.transport_failures += 1;
            self.transport_failures
        } else {
            self.attempts
        };

        if !strategy.should_retry(options, &attempt.response, number) {
            return None;
        }

        let delay = strategy.retry_after(options, &attempt.response, number);
        warn!(
            status = attempt.response.status,
            attempt = number,
            ?delay,
            url = %options.url,
            "Retrying request"
        );
        Some((delay, attempt.response.status == 401))
    }
}

// ============================================================================
// Blocking runtime
// ============================================================================

/// Runtime that drives blocking dispatch, shared by every [`Network`].
struct BlockingRuntime(tokio::runtime::Runtime);

fn blocking_runtime() -> BoxResult<Arc<BlockingRuntime>> {
    SingletonRegistry::global().get_or_try_init(|| -> BoxResult<BlockingRuntime> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("boxkit-blocking")
            .enable_all()
            .build()
            .map_err(NetError::Runtime)?;
        Ok(BlockingRuntime(runtime))
    })
}

// ============================================================================
// Network
// ============================================================================

/// Dispatches API calls through a [`NetworkSession`].
///
/// Every attempt waits on the session's rate limiter, carries the session and
/// auth headers, and is replayed according to the retry strategy. Responses
/// outside `200..400` become [`BoxError::Api`].
#[derive(Clone)]
pub struct Network {
    session: NetworkSession,
    auth: Option<Arc<dyn Authentication>>,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("session", &self.session)
            .field("authenticated", &self.auth.is_some())
            .finish()
    }
}

impl Network {
    pub const fn new(session: NetworkSession) -> Self {
        Self { session, auth: None }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn Authentication>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Same auth, different session.
    #[must_use]
    pub fn with_session(&self, session: NetworkSession) -> Self {
        Self {
            session,
            auth: self.auth.clone(),
        }
    }

    pub const fn session(&self) -> &NetworkSession {
        &self.session
    }

    pub fn auth(&self) -> Option<&Arc<dyn Authentication>> {
        self.auth.as_ref()
    }

    /// Perform a call, retrying as the session's strategy allows.
    pub async fn request(&self, options: FetchOptions) -> BoxResult<FetchResponse> {
        let options = self.effective_options(options);
        let strategy = Arc::clone(self.session.retry_strategy());
        let mut state = RetryState::default();

        let mut attempt = self.attempt(&options, false).await?;
        while let Some((delay, reauthenticate)) = state.next_retry(strategy.as_ref(), &options, &attempt) {
            attempt = Self::retry_after(delay, || self.attempt(&options, reauthenticate)).await?;
        }
        self.finish(attempt)
    }

    /// Blocking variant of [`request`](Self::request).
    ///
    /// Waits on the rate limiter and between retries on the calling thread.
    /// Fails with [`BoxError::Configuration`] when called from inside an
    /// async runtime, where blocking would stall its workers.
    pub fn request_blocking(&self, options: FetchOptions) -> BoxResult<FetchResponse> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(BoxError::configuration(
                "request_blocking cannot be called from inside an async runtime; use request().await",
            ));
        }

        let runtime = blocking_runtime()?;
        let options = self.effective_options(options);
        let strategy = Arc::clone(self.session.retry_strategy());
        let mut state = RetryState::default();

        let mut attempt = self.attempt_blocking(&runtime, &options, false)?;
        while let Some((delay, reauthenticate)) = state.next_retry(strategy.as_ref(), &options, &attempt) {
            attempt = Self::retry_after_blocking(delay, || {
                self.attempt_blocking(&runtime, &options, reauthenticate)
            })?;
        }
        self.finish(attempt)
    }

    /// Sleep for `delay`, then run `call`.
    pub async fn retry_after<F, Fut, T>(delay: Duration, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        tokio::time::sleep(delay).await;
        call().await
    }

    /// Block the thread for `delay`, then run `call`.
    pub fn retry_after_blocking<F, T>(delay: Duration, call: F) -> T
    where
        F: FnOnce() -> T,
    {
        std::thread::sleep(delay);
        call()
    }

    /// Authorization is only attached when there is something to attach.
    fn effective_options(&self, options: FetchOptions) -> FetchOptions {
        FetchOptions {
            authenticated: options.authenticated && self.auth.is_some(),
            ..options
        }
    }

    async fn attempt(&self, options: &FetchOptions, reauthenticate: bool) -> BoxResult<Attempt> {
        if let Some(limiter) = self.session.rate_limiter() {
            limiter.acquire_async().await;
        }
        self.exchange(options, reauthenticate).await
    }

    fn attempt_blocking(
        &self,
        runtime: &BlockingRuntime,
        options: &FetchOptions,
        reauthenticate: bool,
    ) -> BoxResult<Attempt> {
        if let Some(limiter) = self.session.rate_limiter() {
            limiter.acquire();
        }
        runtime.0.block_on(self.exchange(options, reauthenticate))
    }

    /// Prepare and send one request. Transport failures are folded into the
    /// attempt so the retry strategy can see them.
    async fn exchange(&self, options: &FetchOptions, reauthenticate: bool) -> BoxResult<Attempt> {
        let request = self.prepare_request(options, reauthenticate).await?;
        debug!(
            method = %request.method,
            url = %request.url,
            headers = ?self.session.data_sanitizer().sanitize_headers(&request.headers),
            "Sending request"
        );

        match self
            .session
            .network_client()
            .execute(&request, options.response_format)
            .await
        {
            Ok(response) => {
                debug!(status = response.status, url = %response.url, "Received response");
                Ok(Attempt {
                    request,
                    response,
                    transport_error: None,
                })
            }
            Err(BoxError::Network { message }) => {
                warn!(url = %request.url, error = %message, "Request failed before a response arrived");
                Ok(Attempt {
                    response: FetchResponse::transport_failure(&request.url),
                    request,
                    transport_error: Some(message),
                })
            }
            Err(other) => Err(other),
        }
    }

    async fn prepare_request(&self, options: &FetchOptions, reauthenticate: bool) -> BoxResult<ApiRequest> {
        let mut headers: BTreeMap<String, String> = self.session.additional_headers().clone();
        headers.extend(options.headers.clone());

        if let Some(auth) = self.auth.as_ref().filter(|_| options.authenticated) {
            if reauthenticate {
                info!("Refreshing access token");
                auth.refresh_token().await?;
            }
            headers.insert(
                "Authorization".to_string(),
                auth.retrieve_authorization_header().await?,
            );
        }
        headers.insert("User-Agent".to_string(), self.session.user_agent().to_string());
        headers.insert("X-Box-UA".to_string(), X_BOX_UA.to_string());

        Ok(ApiRequest {
            method: options.method,
            url: options.url.clone(),
            params: options.params.clone(),
            headers,
            body: options.body.clone(),
            follow_redirects: options.follow_redirects,
        })
    }

    fn finish(&self, attempt: Attempt) -> BoxResult<FetchResponse> {
        let Attempt {
            request,
            response,
            transport_error,
        } = attempt;

        if let Some(message) = transport_error {
            return Err(BoxError::Network { message });
        }
        if response.is_success() {
            return Ok(response);
        }

        let status = response.status;
        let raw_body = response.text();
        let request_info = RequestInfo {
            method: request.method.to_string(),
            url: request.url,
            query_params: request.params,
            headers: request.headers,
            body: request.body.describe(),
        };
        let response_info = ResponseInfo::from_parts(status, response.headers, raw_body);
        let error = ApiError::new(
            request_info,
            response_info,
            self.session.data_sanitizer().clone(),
        );
        debug!(status, message = %error.message, "API call failed");
        Err(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{error_body, json_response, FakeNetworkClient};
    use boxkit_core::{
        AccessToken, BoxRetryStrategy, DeveloperTokenAuth, Method, RateLimiter, ResponseFormat,
    };
    use mockall::mock;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    mock! {
        Auth {}

        #[async_trait::async_trait]
        impl Authentication for Auth {
            async fn retrieve_token(&self) -> BoxResult<AccessToken>;
            async fn refresh_token(&self) -> BoxResult<AccessToken>;
            async fn retrieve_authorization_header(&self) -> BoxResult<String>;
        }
    }

    const URL: &str = "https://api.box.com/2.0/users/me";

    fn fast_retries() -> Arc<BoxRetryStrategy> {
        Arc::new(
            BoxRetryStrategy::default()
                .with_base_interval(Duration::from_millis(1))
                .with_max_attempts(3),
        )
    }

    fn network(fake: &Arc<FakeNetworkClient>) -> Network {
        let session = NetworkSession::from_client(Arc::clone(fake) as _).with_retry_strategy(fast_retries());
        Network::new(session).with_auth(Arc::new(DeveloperTokenAuth::new("dev-token")))
    }

    fn retry_after_zero(status: u16) -> FetchResponse {
        let mut response = json_response(status, error_body(status, "rate_limit_exceeded", "Slow down"));
        response.headers.insert("Retry-After".to_string(), "0".to_string());
        response
    }

    #[tokio::test]
    async fn test_request_sends_session_call_and_auth_headers() {
        let fake = Arc::new(FakeNetworkClient::new().with_json(200, json!({"id": "42"})));
        let network = network(&fake);
        let network = network.with_session(network.session().with_additional_headers(BTreeMap::from([(
            "X-Session".to_string(),
            "s".to_string(),
        )])));

        let response = network
            .request(FetchOptions::get(URL).with_header("X-Call", "c").with_param("fields", "name"))
            .await
            .unwrap();
        assert_eq!(response.data.unwrap()["id"], "42");

        let sent = fake.last_request().unwrap();
        assert_eq!(sent.headers["Authorization"], "Bearer dev-token");
        assert_eq!(sent.headers["User-Agent"], USER_AGENT);
        assert_eq!(sent.headers["X-Box-UA"], X_BOX_UA);
        assert_eq!(sent.headers["X-Session"], "s");
        assert_eq!(sent.headers["X-Call"], "c");
        assert_eq!(sent.params, vec![("fields".to_string(), "name".to_string())]);
    }

    #[tokio::test]
    async fn test_unauthenticated_call_has_no_authorization() {
        let fake = Arc::new(FakeNetworkClient::new().with_json(200, json!({})));
        network(&fake)
            .request(FetchOptions::get(URL).unauthenticated())
            .await
            .unwrap();
        assert!(!fake.last_request().unwrap().headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn test_429_is_retried_after_header_delay() {
        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_response(retry_after_zero(429))
                .with_json(200, json!({"ok": true})),
        );
        let response = network(&fake).request(FetchOptions::get(URL)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(fake.call_count(), 2);
    }

    #[tokio::test]
    async fn test_202_with_retry_after_is_polled_until_ready() {
        let mut pending = json_response(202, json!({"status": "pending"}));
        pending.headers.insert("Retry-After".to_string(), "0".to_string());
        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_response(pending.clone())
                .with_response(pending)
                .with_json(200, json!({"id": "zip-1", "state": "succeeded"})),
        );

        let response = network(&fake).request(FetchOptions::get(URL)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.data.unwrap()["state"], "succeeded");
        assert_eq!(fake.call_count(), 3);
    }

    #[tokio::test]
    async fn test_202_without_retry_after_is_returned() {
        let fake = Arc::new(FakeNetworkClient::new().with_json(202, json!({"status": "accepted"})));
        let response = network(&fake).request(FetchOptions::get(URL)).await.unwrap();
        assert_eq!(response.status, 202);
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_attempts() {
        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_fallback(json_response(503, error_body(503, "unavailable", "Try later"))),
        );
        let err = network(&fake).request(FetchOptions::get(URL)).await.unwrap_err();

        assert_eq!(fake.call_count(), 3);
        assert_eq!(err.status(), Some(503));
        let api = err.as_api_error().unwrap();
        assert_eq!(api.message, "503 Try later; Request ID: fake-request-id");
        assert_eq!(api.response.code.as_deref(), Some("unavailable"));
        assert_eq!(api.request.method, "GET");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let fake = Arc::new(
            FakeNetworkClient::new().with_json(404, error_body(404, "not_found", "Not Found")),
        );
        let err = network(&fake).request(FetchOptions::get(URL)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failures_use_exception_budget() {
        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_transport_error("connection reset")
                .with_transport_error("connection reset")
                .with_transport_error("connection reset"),
        );
        let err = network(&fake).request(FetchOptions::get(URL)).await.unwrap_err();

        assert!(matches!(err, BoxError::Network { ref message } if message == "connection reset"));
        assert_eq!(fake.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_then_success() {
        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_transport_error("timed out")
                .with_json(200, json!({"id": "1"})),
        );
        let response = network(&fake).request(FetchOptions::get(URL)).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_401_refreshes_token_before_replay() {
        let refreshed = Arc::new(AtomicBool::new(false));
        let mut auth = MockAuth::new();
        {
            let refreshed = Arc::clone(&refreshed);
            auth.expect_refresh_token().times(1).returning(move || {
                refreshed.store(true, Ordering::SeqCst);
                Ok(AccessToken::bearer("fresh"))
            });
        }
        {
            let refreshed = Arc::clone(&refreshed);
            auth.expect_retrieve_authorization_header().returning(move || {
                let token = if refreshed.load(Ordering::SeqCst) { "fresh" } else { "stale" };
                Ok(format!("Bearer {token}"))
            });
        }

        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_json(401, error_body(401, "unauthorized", "Unauthorized"))
                .with_json(200, json!({"id": "me"})),
        );
        let network = network(&fake).with_auth(Arc::new(auth));
        network.request(FetchOptions::get(URL)).await.unwrap();

        let requests = fake.requests();
        assert_eq!(requests[0].headers["Authorization"], "Bearer stale");
        assert_eq!(requests[1].headers["Authorization"], "Bearer fresh");
    }

    #[tokio::test]
    async fn test_401_with_developer_token_is_auth_error() {
        let fake = Arc::new(
            FakeNetworkClient::new().with_json(401, error_body(401, "unauthorized", "Unauthorized")),
        );
        let err = network(&fake).request(FetchOptions::get(URL)).await.unwrap_err();

        assert!(matches!(err, BoxError::Auth { .. }));
        assert!(err.to_string().contains("Developer token has expired"));
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_401_without_auth_is_api_error() {
        let fake = Arc::new(
            FakeNetworkClient::new().with_json(401, error_body(401, "unauthorized", "Unauthorized")),
        );
        let network = Network::new(NetworkSession::from_client(Arc::clone(&fake) as _));
        let err = network.request(FetchOptions::get(URL)).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_api_error_display_redacts_token() {
        let fake = Arc::new(
            FakeNetworkClient::new().with_json(400, error_body(400, "bad_request", "Bad")),
        );
        let err = network(&fake)
            .request(FetchOptions::new(Method::Post, URL).with_json(json!({"name": "x"})))
            .await
            .unwrap_err();

        let rendered = err.to_string();
        assert!(rendered.contains("400 Bad; Request ID: fake-request-id"));
        assert!(!rendered.contains("dev-token"));
        let api = err.as_api_error().unwrap();
        assert_eq!(api.request.body.as_deref(), Some(r#"{"name":"x"}"#));
    }

    #[tokio::test]
    async fn test_rate_limiter_sees_every_attempt() {
        let limiter = Arc::new(RateLimiter::per_second(100).unwrap());
        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_response(retry_after_zero(429))
                .with_fallback(json_response(200, json!({}))),
        );
        let base = network(&fake);
        let network = base.with_session(base.session().with_rate_limiter(Arc::clone(&limiter)));

        network.request(FetchOptions::get(URL)).await.unwrap();
        network.request(FetchOptions::get(URL)).await.unwrap();
        assert_eq!(limiter.in_flight(), 3);
    }

    #[tokio::test]
    async fn test_request_blocking_inside_runtime_is_rejected() {
        let fake = Arc::new(FakeNetworkClient::new());
        let err = network(&fake)
            .request_blocking(FetchOptions::get(URL))
            .unwrap_err();
        assert!(matches!(err, BoxError::Configuration { .. }));
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn test_request_blocking_retries() {
        let fake = Arc::new(
            FakeNetworkClient::new()
                .with_response(retry_after_zero(429))
                .with_json(200, json!({"id": "1"})),
        );
        let response = network(&fake)
            .request_blocking(FetchOptions::get(URL).with_response_format(ResponseFormat::Json))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(fake.call_count(), 2);
    }

    #[test]
    fn test_request_blocking_waits_on_rate_limiter() {
        let limiter = Arc::new(
            RateLimiter::new(boxkit_core::RateLimitConfig::new(1, Duration::from_millis(50))).unwrap(),
        );
        let fake = Arc::new(FakeNetworkClient::new().with_fallback(json_response(200, json!({}))));
        let base = network(&fake);
        let network = base.with_session(base.session().with_rate_limiter(limiter));

        let started = Instant::now();
        network.request_blocking(FetchOptions::get(URL)).unwrap();
        network.request_blocking(FetchOptions::get(URL)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_retry_after_sleeps_then_calls() {
        let started = Instant::now();
        let value = Network::retry_after(Duration::from_millis(20), || async { 7 }).await;
        assert_eq!(value, 7);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_retry_after_blocking_sleeps_then_calls() {
        let started = Instant::now();
        let value = Network::retry_after_blocking(Duration::from_millis(20), || "done");
        assert_eq!(value, "done");
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
