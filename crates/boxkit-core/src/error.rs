//! Error types shared by every boxkit crate.
//!
//! Adapter crates keep their own internal errors (HTTP, URL parsing) and map
//! them into [`BoxError`] at the boundary.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::sanitize::{DataSanitizer, REDACTED};

/// Result type alias for boxkit operations.
pub type BoxResult<T> = Result<T, BoxError>;

/// Errors surfaced by the boxkit client stack.
#[derive(Debug, Error)]
pub enum BoxError {
    /// The API answered with an unsuccessful status.
    #[error("{0}")]
    Api(Box<ApiError>),

    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("Network error: {message}")]
    Network {
        /// Description of the network failure
        message: String,
    },

    /// Authentication could not produce or refresh a token.
    #[error("Authentication error: {message}")]
    Auth {
        /// What went wrong
        message: String,
    },

    /// A rate limiter could not be built or used.
    #[error("Rate limit error: {message}")]
    RateLimit {
        /// What went wrong
        message: String,
    },

    /// The server returned paging data that cannot be followed.
    #[error("Pagination error: {message}")]
    Pagination {
        /// What went wrong
        message: String,
    },

    /// The API returned an invalid or unexpected response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Invalid client configuration or misuse of the API surface.
    #[error("Configuration error: {message}")]
    Configuration {
        /// What's wrong with the configuration
        message: String,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BoxError {
    /// Shorthand for a [`BoxError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a [`BoxError::Network`].
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Shorthand for a [`BoxError::Auth`].
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(api) => Some(api.response.status_code),
            _ => None,
        }
    }

    /// The API error details, if this is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }

    /// Whether the API reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<ApiError> for BoxError {
    fn from(err: ApiError) -> Self {
        Self::Api(Box::new(err))
    }
}

// ============================================================================
// API error details
// ============================================================================

/// The request half of an [`ApiError`].
///
/// `Debug` output passes headers and body through the default
/// [`DataSanitizer`].
#[derive(Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
    pub query_params: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// The response half of an [`ApiError`].
#[derive(Clone, Default)]
pub struct ResponseInfo {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, `Value::Null` when the body was empty or not JSON
    pub body: Value,
    pub raw_body: String,
    /// Box error code, e.g. `item_name_in_use`
    pub code: Option<String>,
    pub context_info: Option<Value>,
    pub request_id: Option<String>,
    pub help_url: Option<String>,
}

impl RequestInfo {
    fn fmt_redacted(&self, f: &mut fmt::Formatter<'_>, sanitizer: &DataSanitizer) -> fmt::Result {
        f.debug_struct("RequestInfo")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query_params", &self.query_params)
            .field("headers", &sanitizer.sanitize_headers(&self.headers))
            .field(
                "body",
                &self.body.as_deref().map(|body| redact_body(sanitizer, body)),
            )
            .finish()
    }
}

impl fmt::Debug for RequestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_redacted(f, &DataSanitizer::default())
    }
}

impl ResponseInfo {
    fn fmt_redacted(&self, f: &mut fmt::Formatter<'_>, sanitizer: &DataSanitizer) -> fmt::Result {
        f.debug_struct("ResponseInfo")
            .field("status_code", &self.status_code)
            .field("headers", &sanitizer.sanitize_headers(&self.headers))
            .field("body", &sanitizer.sanitize_body(&self.body))
            .field("raw_body", &redact_body(sanitizer, &self.raw_body))
            .field("code", &self.code)
            .field("context_info", &self.context_info)
            .field("request_id", &self.request_id)
            .field("help_url", &self.help_url)
            .finish()
    }
}

impl fmt::Debug for ResponseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_redacted(f, &DataSanitizer::default())
    }
}

/// Redact a request or response body kept as text.
///
/// JSON bodies go through [`DataSanitizer::sanitize_body`]; form bodies have
/// sensitive field values replaced. Anything else is returned unchanged.
fn redact_body(sanitizer: &DataSanitizer, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return sanitizer.sanitize_body(&value).to_string();
    }
    if !body.contains('=') || body.contains(char::is_whitespace) {
        return body.to_string();
    }
    body.split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if sanitizer.is_sensitive(key) => format!("{key}={REDACTED}"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

impl ResponseInfo {
    /// Build response info from a status, headers and raw body text.
    ///
    /// The Box error fields (`code`, `request_id`, ...) are lifted out of the
    /// JSON body when present.
    pub fn from_parts(status_code: u16, headers: BTreeMap<String, String>, raw_body: String) -> Self {
        let body: Value = serde_json::from_str(&raw_body).unwrap_or(Value::Null);
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            status_code,
            code: text("code"),
            request_id: text("request_id"),
            help_url: text("help_url"),
            context_info: body.get("context_info").cloned(),
            headers,
            body,
            raw_body,
        }
    }

    /// The human readable `message` field of the error body, if any.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

/// An unsuccessful API call with everything needed to debug it.
#[derive(Clone)]
pub struct ApiError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub request: RequestInfo,
    pub response: ResponseInfo,
    sanitizer: DataSanitizer,
}

impl ApiError {
    /// Create an API error. The message follows the Box convention
    /// `"<status> <message>; Request ID: <id>"`.
    pub fn new(request: RequestInfo, response: ResponseInfo, sanitizer: DataSanitizer) -> Self {
        let message = format!(
            "{} {}; Request ID: {}",
            response.status_code,
            response.message().unwrap_or_default(),
            response.request_id.as_deref().unwrap_or_default()
        );
        Self {
            message,
            timestamp: Utc::now(),
            request,
            response,
            sanitizer,
        }
    }
}

/// Borrowed view that formats request or response details through a
/// specific sanitizer.
struct Redacted<'a, T> {
    inner: &'a T,
    sanitizer: &'a DataSanitizer,
}

impl fmt::Debug for Redacted<'_, RequestInfo> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt_redacted(f, self.sanitizer)
    }
}

impl fmt::Debug for Redacted<'_, ResponseInfo> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt_redacted(f, self.sanitizer)
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("message", &self.message)
            .field("timestamp", &self.timestamp)
            .field(
                "request",
                &Redacted {
                    inner: &self.request,
                    sanitizer: &self.sanitizer,
                },
            )
            .field(
                "response",
                &Redacted {
                    inner: &self.response,
                    sanitizer: &self.sanitizer,
                },
            )
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request_headers = self.sanitizer.sanitize_headers(&self.request.headers);
        let response_headers = self.sanitizer.sanitize_headers(&self.response.headers);
        let response_body = self.sanitizer.sanitize_body(&self.response.body);

        writeln!(f, "Timestamp: {}", self.timestamp.to_rfc3339())?;
        writeln!(f, "Message: {}", self.message)?;
        writeln!(f, "Request:")?;
        writeln!(f, "\tMethod: {}", self.request.method)?;
        writeln!(f, "\tURL: {}", self.request.url)?;
        writeln!(f, "\tQuery params: {:?}", self.request.query_params)?;
        writeln!(f, "\tHeaders: {request_headers:?}")?;
        writeln!(f, "Response:")?;
        writeln!(f, "\tStatus code: {}", self.response.status_code)?;
        writeln!(f, "\tHeaders: {response_headers:?}")?;
        writeln!(f, "\tCode: {}", self.response.code.as_deref().unwrap_or("None"))?;
        writeln!(f, "\tRequest Id: {}", self.response.request_id.as_deref().unwrap_or("None"))?;
        writeln!(f, "\tHelp Url: {}", self.response.help_url.as_deref().unwrap_or("None"))?;
        write!(f, "\tBody: {response_body}")
    }
}
