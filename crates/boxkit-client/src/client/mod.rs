//! Box client: request helpers and derived contexts.

mod collection;
mod endpoints;
mod request;

pub use collection::{Collection, MarkerCollection, OffsetCollection};
pub use request::{BoxResponse, RequestOptions};

use std::collections::BTreeMap;
use std::sync::Arc;

use boxkit_core::{Authentication, BoxResult, FetchOptions, Method};
use boxkit_net::Network;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::BoxClientConfig;

/// Build the `BoxApi` header value for shared-link access.
pub fn shared_link_header(shared_link: &str, password: Option<&str>) -> String {
    match password {
        Some(password) => format!("shared_link={shared_link}&shared_link_password={password}"),
        None => format!("shared_link={shared_link}"),
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client for the Box content API.
///
/// Cheap to clone. [`as_user`](Self::as_user),
/// [`with_shared_link`](Self::with_shared_link) and
/// [`with_headers`](Self::with_headers) derive clients that share the
/// transport, auth and rate limiter.
#[derive(Debug, Clone)]
pub struct BoxClient {
    network: Network,
}

impl BoxClient {
    /// Create a client from configuration and authentication.
    pub fn new(config: &BoxClientConfig, auth: Arc<dyn Authentication>) -> BoxResult<Self> {
        Ok(Self {
            network: config.build_network(Some(auth))?,
        })
    }

    /// Wrap an already configured network layer.
    pub const fn with_network(network: Network) -> Self {
        Self { network }
    }

    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// Absolute URL of an API endpoint, e.g. `get_url("folders", &["0", "items"])`.
    pub fn get_url<P: AsRef<str>>(&self, endpoint: &str, parts: &[P]) -> String {
        self.network.session().base_urls().api_url(endpoint, parts)
    }

    /// A client whose calls act as another user (`As-User`).
    #[must_use]
    pub fn as_user(&self, user_id: &str) -> Self {
        self.with_headers(BTreeMap::from([("As-User".to_string(), user_id.to_string())]))
    }

    /// A client whose calls are authorized by a shared link (`BoxApi`).
    #[must_use]
    pub fn with_shared_link(&self, shared_link: &str, password: Option<&str>) -> Self {
        self.with_headers(BTreeMap::from([(
            "BoxApi".to_string(),
            shared_link_header(shared_link, password),
        )]))
    }

    /// A client that sends `headers` on every call.
    #[must_use]
    pub fn with_headers(&self, headers: BTreeMap<String, String>) -> Self {
        let session = self.network.session().with_additional_headers(headers);
        Self {
            network: self.network.with_session(session),
        }
    }

    /// Make a call. Unsuccessful statuses come back as
    /// [`BoxError::Api`](boxkit_core::BoxError::Api).
    pub async fn request(&self, method: Method, url: &str, options: RequestOptions) -> BoxResult<BoxResponse> {
        let format = options.response_format(method != Method::Delete);
        let mut fetch = FetchOptions::new(method, url)
            .with_params(options.params)
            .with_headers(options.headers)
            .with_body(options.body)
            .with_response_format(format);
        if let Some(follow) = options.follow_redirects {
            fetch = fetch.with_follow_redirects(follow);
        }

        debug!(%method, url, "API call");
        let response = self.network.request(fetch).await?;
        Ok(BoxResponse::new(response))
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> BoxResult<BoxResponse> {
        self.request(Method::Get, url, options).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> BoxResult<BoxResponse> {
        self.request(Method::Post, url, options).await
    }

    pub async fn put(&self, url: &str, options: RequestOptions) -> BoxResult<BoxResponse> {
        self.request(Method::Put, url, options).await
    }

    /// DELETE does not expect a JSON body unless the options say so.
    pub async fn delete(&self, url: &str, options: RequestOptions) -> BoxResult<BoxResponse> {
        self.request(Method::Delete, url, options).await
    }

    pub async fn options(&self, url: &str, options: RequestOptions) -> BoxResult<BoxResponse> {
        self.request(Method::Options, url, options).await
    }

    /// GET an endpoint and deserialize the body.
    pub async fn get_json<T: DeserializeOwned, P: AsRef<str> + Sync>(
        &self,
        endpoint: &str,
        parts: &[P],
    ) -> BoxResult<T> {
        let url = self.get_url(endpoint, parts);
        self.get(&url, RequestOptions::new()).await?.json()
    }
}
