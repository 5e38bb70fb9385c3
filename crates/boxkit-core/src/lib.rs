#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod fetch;
pub mod pagination;
pub mod ports;
pub mod rate_limit;
pub mod retry;
pub mod sanitize;
pub mod singleton;
pub mod urls;

// Re-export commonly used types for convenience
pub use auth::{AccessToken, Authentication, DeveloperTokenAuth, InMemoryTokenStorage, TokenStorage};
pub use error::{ApiError, BoxError, BoxResult, RequestInfo, ResponseInfo};
pub use fetch::{ApiRequest, FetchOptions, FetchResponse, Method, RequestBody, ResponseFormat};
pub use pagination::{MarkerCursor, OffsetCursor, Page, PageCursor};
pub use ports::NetworkClient;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::{BoxRetryStrategy, RetryStrategy};
pub use sanitize::DataSanitizer;
pub use singleton::{Singleton, SingletonRegistry};
pub use urls::BaseUrls;
