//! reqwest-backed transport.
//!
//! [`ReqwestNetworkClient`] performs exactly one attempt per call. Status
//! handling, retries and auth are the job of [`Network`](crate::Network).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boxkit_core::sanitize::REDACTED;
use boxkit_core::{
    ApiRequest, BoxResult, FetchResponse, Method, NetworkClient, RequestBody, ResponseFormat,
    SingletonRegistry,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use tracing::trace;
use url::Url;

use crate::error::{NetError, NetResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Construction options for [`ReqwestNetworkClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Full proxy URL, credentials included
    pub proxy_url: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            proxy_url: None,
        }
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("proxy_url", &self.proxy_url.as_deref().map(redact_proxy_url))
            .finish()
    }
}

/// Proxy URL with any `user:pass@` part replaced.
fn redact_proxy_url(proxy_url: &str) -> String {
    match Url::parse(proxy_url) {
        Ok(url) if url.username().is_empty() && url.password().is_none() => proxy_url.to_string(),
        Ok(url) => {
            let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();
            format!(
                "{}://{REDACTED}@{}{port}",
                url.scheme(),
                url.host_str().unwrap_or_default()
            )
        }
        Err(_) => REDACTED.to_string(),
    }
}

/// Production transport using reqwest.
///
/// reqwest fixes the redirect policy per client, so two clients share the
/// configuration: one follows redirects and one hands 3xx back to the caller.
#[derive(Debug, Clone)]
pub struct ReqwestNetworkClient {
    following: reqwest::Client,
    not_following: reqwest::Client,
}

impl ReqwestNetworkClient {
    /// Build a transport with its own connection pools.
    pub fn new(config: &TransportConfig) -> BoxResult<Self> {
        Ok(Self {
            following: Self::build(config, Policy::default())?,
            not_following: Self::build(config, Policy::none())?,
        })
    }

    /// The process-wide default transport, created on first use.
    pub fn shared() -> BoxResult<Arc<Self>> {
        SingletonRegistry::global().get_or_try_init(|| Self::new(&TransportConfig::default()))
    }

    fn build(config: &TransportConfig, redirect: Policy) -> NetResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(redirect);
        if let Some(ref proxy_url) = config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        Ok(builder.build()?)
    }

    const fn client(&self, follow_redirects: bool) -> &reqwest::Client {
        if follow_redirects {
            &self.following
        } else {
            &self.not_following
        }
    }

    fn header_map(headers: &BTreeMap<String, String>) -> NetResult<HeaderMap> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let invalid = || NetError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    const fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    async fn send(&self, request: &ApiRequest, format: ResponseFormat) -> NetResult<FetchResponse> {
        let url = Url::parse(&request.url)?;
        let mut builder = self
            .client(request.follow_redirects)
            .request(Self::method(request.method), url)
            .headers(Self::header_map(&request.headers)?);

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Bytes { data, content_type } => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect::<BTreeMap<_, _>>();

        // Error bodies are kept, and parsed as JSON, whatever the caller asked for
        let success = (200..400).contains(&status);
        let content = if format == ResponseFormat::NoContent && success {
            Vec::new()
        } else {
            response.bytes().await?.to_vec()
        };

        let parse_json = format == ResponseFormat::Json || !success;
        let data = if parse_json && !content.is_empty() {
            serde_json::from_slice(&content).ok()
        } else {
            None
        };

        trace!(status, url = %final_url, bytes = content.len(), "Received response");

        Ok(FetchResponse {
            url: final_url,
            status,
            headers,
            data,
            content,
        })
    }
}

#[async_trait]
impl NetworkClient for ReqwestNetworkClient {
    async fn execute(&self, request: &ApiRequest, format: ResponseFormat) -> BoxResult<FetchResponse> {
        Ok(self.send(request, format).await?)
    }
}
