//! Port definitions (trait abstractions) for external systems.
//!
//! The core never talks HTTP itself. A transport implements
//! [`NetworkClient`] to perform exactly one attempt; retry, rate limiting
//! and auth live in the network layer above it.

use async_trait::async_trait;

use crate::error::BoxResult;
use crate::fetch::{ApiRequest, FetchResponse, ResponseFormat};

/// Port trait for a single-attempt HTTP transport.
///
/// # Design
///
/// - Any HTTP status, including 4xx/5xx, is a successful `Ok` attempt
/// - `Err(BoxError::Network { .. })` means nothing came back; the caller may
///   retry it
/// - Any other error is final (bad URL, unsupported body)
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn execute(&self, request: &ApiRequest, format: ResponseFormat) -> BoxResult<FetchResponse>;
}
