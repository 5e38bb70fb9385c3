//! Internal error types for the network layer.
//!
//! These errors stay inside `boxkit-net` and are mapped to [`BoxError`] at
//! the boundary by [`map_error`].

use boxkit_core::BoxError;
use thiserror::Error;

/// Result type alias for transport operations.
pub type NetResult<T> = Result<T, NetError>;

/// Errors raised while talking to the wire.
#[derive(Debug, Error)]
pub enum NetError {
    /// Network or HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value that cannot go on the wire.
    #[error("Invalid header '{name}'")]
    InvalidHeader {
        /// The offending header name
        name: String,
    },

    /// The proxy URL is unusable.
    #[error("Invalid proxy URL '{url}': {reason}")]
    InvalidProxy {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The blocking runtime could not be started.
    #[error("Failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Map an internal error into the shared [`BoxError`].
///
/// Only failures where no response came back become
/// [`BoxError::Network`]; the retry loop replays those.
pub fn map_error(err: NetError) -> BoxError {
    match err {
        NetError::Http(e) if e.is_builder() => BoxError::Configuration {
            message: format!("Request could not be built: {e}"),
        },
        NetError::Http(e) => BoxError::Network {
            message: e.to_string(),
        },
        NetError::InvalidUrl(e) => BoxError::Configuration {
            message: format!("Invalid URL: {e}"),
        },
        other @ (NetError::InvalidHeader { .. }
        | NetError::InvalidProxy { .. }
        | NetError::Runtime(_)) => BoxError::Configuration {
            message: other.to_string(),
        },
    }
}

impl From<NetError> for BoxError {
    fn from(err: NetError) -> Self {
        map_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_configuration() {
        let err = url::Url::parse("not a url").unwrap_err();
        assert!(matches!(
            map_error(NetError::from(err)),
            BoxError::Configuration { .. }
        ));
    }

    #[test]
    fn test_invalid_header_message() {
        let err = NetError::InvalidHeader {
            name: "Bad\nName".to_string(),
        };
        assert!(err.to_string().contains("Invalid header"));
        assert!(matches!(map_error(err), BoxError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_proxy_message() {
        let err = NetError::InvalidProxy {
            url: "ftp://proxy".to_string(),
            reason: "must start with http".to_string(),
        };
        let mapped = map_error(err);
        assert!(mapped.to_string().contains("ftp://proxy"));
    }
}
