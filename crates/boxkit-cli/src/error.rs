//! CLI-specific error types and mappings.
//!
//! Library errors are mapped to exit codes and user-facing messages here.

use boxkit_client::BoxError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// API error or anything without a more specific category.
    #[error("{0}")]
    Api(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Box could not be reached, or kept failing after retries.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Writing output failed.
    #[error("IO error: {0}")]
    Io(String),

    /// The token was rejected or could not be refreshed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Api(_) => 1,
            Self::Arguments(_) => 2,    // EX_USAGE
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Io(_) => 74,          // EX_IOERR
            Self::Auth(_) => 77,        // EX_NOPERM
            Self::Config(_) => 78,      // EX_CONFIG
        }
    }
}

impl From<BoxError> for CliError {
    fn from(err: BoxError) -> Self {
        match err {
            BoxError::Api(api) => match api.response.status_code {
                401 | 403 => Self::Auth(api.message),
                429 | 500..=599 => Self::Unavailable(api.message),
                _ => Self::Api(api.message),
            },
            BoxError::Network { message } => Self::Unavailable(message),
            BoxError::Auth { message } => Self::Auth(message),
            BoxError::RateLimit { message } | BoxError::Configuration { message } => {
                Self::Config(message)
            }
            other @ (BoxError::Pagination { .. }
            | BoxError::InvalidResponse { .. }
            | BoxError::Json(_)) => Self::Api(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Api(format!("Could not render response: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxkit_client::BoxError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Api("x".into()).exit_code(), 1);
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Unavailable("x".into()).exit_code(), 69);
        assert_eq!(CliError::Io("x".into()).exit_code(), 74);
        assert_eq!(CliError::Auth("x".into()).exit_code(), 77);
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
    }

    #[test]
    fn test_from_box_error() {
        assert!(matches!(
            CliError::from(BoxError::network("connection reset")),
            CliError::Unavailable(msg) if msg == "connection reset"
        ));
        assert!(matches!(
            CliError::from(BoxError::auth("expired")),
            CliError::Auth(_)
        ));
        assert!(matches!(
            CliError::from(BoxError::configuration("bad proxy")),
            CliError::Config(_)
        ));
        assert!(matches!(
            CliError::from(BoxError::InvalidResponse {
                message: "no entries".into()
            }),
            CliError::Api(msg) if msg.contains("no entries")
        ));
    }

    #[test]
    fn test_io_error_display() {
        let err = CliError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(err.exit_code(), 74);
        assert_eq!(err.to_string(), "IO error: closed");
    }
}
