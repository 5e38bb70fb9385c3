//! Request and response types exchanged with the network layer.
//!
//! [`FetchOptions`] is what callers describe; [`ApiRequest`] is the fully
//! prepared request (headers resolved, auth applied) handed to a transport;
//! [`FetchResponse`] is what comes back.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BoxError, BoxResult};

/// HTTP verbs used by the Box API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as `application/json`
    Json(Value),
    /// Serialized as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Raw bytes with an explicit content type
    Bytes {
        data: Vec<u8>,
        content_type: String,
    },
}

impl RequestBody {
    /// The `Content-Type` header this body implies.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Json(_) => Some("application/json"),
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
            Self::Bytes { content_type, .. } => Some(content_type),
        }
    }

    /// Human readable rendering for logs and errors. Binary bodies are
    /// summarized by length.
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Json(value) => Some(value.to_string()),
            Self::Form(fields) => Some(
                fields
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("&"),
            ),
            Self::Bytes { data, .. } => Some(format!("<{} bytes>", data.len())),
        }
    }
}

/// How the caller wants the response body treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Parse the body as JSON
    #[default]
    Json,
    /// Keep the raw bytes
    Binary,
    /// Ignore the body
    NoContent,
}

/// Everything a caller specifies about one API call.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub url: String,
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
    pub response_format: ResponseFormat,
    pub follow_redirects: bool,
    /// Whether the `Authorization` header should be attached
    pub authenticated: bool,
}

impl FetchOptions {
    /// Options for an authenticated JSON call.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            params: Vec::new(),
            headers: BTreeMap::new(),
            body: RequestBody::Empty,
            response_format: ResponseFormat::Json,
            follow_redirects: true,
            authenticated: true,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
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
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_json(self, value: Value) -> Self {
        self.with_body(RequestBody::Json(value))
    }

    #[must_use]
    pub const fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    #[must_use]
    pub const fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Skip the `Authorization` header (token endpoints, public links).
    #[must_use]
    pub const fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
    pub follow_redirects: bool,
}

/// The outcome of a single attempt.
///
/// A status of `0` means the transport failed before any HTTP status was
/// received; the retry strategy treats those separately.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, when the caller asked for JSON and the body parsed
    pub data: Option<Value>,
    /// Raw body bytes
    pub content: Vec<u8>,
}

impl FetchResponse {
    /// Placeholder response for an attempt that never reached the server.
    pub fn transport_failure(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Look up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Status in `200..400`.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 400
    }

    /// Body as text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Deserialize the JSON body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> BoxResult<T> {
        match &self.data {
            Some(value) => Ok(T::deserialize(value)?),
            None if self.content.is_empty() => Err(BoxError::InvalidResponse {
                message: format!("Empty response body from {}", self.url),
            }),
            None => Ok(serde_json::from_slice(&self.content)?),
        }
    }
}
