//! Per-call options and the response wrapper.

use std::collections::BTreeMap;

use boxkit_core::{BoxResult, FetchResponse, RequestBody, ResponseFormat};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Optional parts of a call made through [`BoxClient`](crate::BoxClient).
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
    /// Overrides the method's default (JSON, except for DELETE)
    pub expect_json_response: Option<bool>,
    pub follow_redirects: Option<bool>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_params<K: Into<String>, V: ToString>(
        mut self,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub const fn expect_json_response(mut self, expect: bool) -> Self {
        self.expect_json_response = Some(expect);
        self
    }

    #[must_use]
    pub const fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    pub(crate) fn response_format(&self, default_json: bool) -> ResponseFormat {
        if self.expect_json_response.unwrap_or(default_json) {
            ResponseFormat::Json
        } else {
            ResponseFormat::NoContent
        }
    }
}

/// A successful API response.
#[derive(Debug, Clone)]
pub struct BoxResponse {
    inner: FetchResponse,
}

impl BoxResponse {
    pub(crate) const fn new(inner: FetchResponse) -> Self {
        Self { inner }
    }

    pub const fn status(&self) -> u16 {
        self.inner.status
    }

    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.inner.headers
    }

    /// Look up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    /// The parsed JSON body, if the call expected one.
    pub const fn json_value(&self) -> Option<&Value> {
        self.inner.data.as_ref()
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> BoxResult<T> {
        self.inner.json()
    }

    pub fn content(&self) -> &[u8] {
        &self.inner.content
    }

    pub fn into_inner(self) -> FetchResponse {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::new()
            .with_param("limit", 10)
            .with_params([("fields", "id,name")])
            .with_header("If-Match", "etag")
            .with_json(json!({"name": "x"}))
            .with_follow_redirects(false);

        assert_eq!(options.params.len(), 2);
        assert_eq!(options.headers["If-Match"], "etag");
        assert_eq!(options.body, RequestBody::Json(json!({"name": "x"})));
        assert_eq!(options.follow_redirects, Some(false));
    }

    #[test]
    fn test_response_format_defaults() {
        let options = RequestOptions::new();
        assert_eq!(options.response_format(true), ResponseFormat::Json);
        assert_eq!(options.response_format(false), ResponseFormat::NoContent);

        let forced = RequestOptions::new().expect_json_response(true);
        assert_eq!(forced.response_format(false), ResponseFormat::Json);
    }

    #[test]
    fn test_box_response_accessors() {
        let response = BoxResponse::new(FetchResponse {
            url: "https://api.box.com/2.0/users/me".to_string(),
            status: 200,
            headers: BTreeMap::from([("ETag".to_string(), "1".to_string())]),
            data: Some(json!({"id": "7"})),
            content: br#"{"id":"7"}"#.to_vec(),
        });

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("etag"), Some("1"));
        assert_eq!(response.json_value().unwrap()["id"], "7");
        let parsed: Value = response.json().unwrap();
        assert_eq!(parsed["id"], "7");
    }
}
