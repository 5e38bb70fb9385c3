#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

mod client;
mod config;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::{
    shared_link_header, BoxClient, BoxResponse, Collection, MarkerCollection, OffsetCollection,
    RequestOptions,
};

// Configuration
pub use config::BoxClientConfig;

// Re-exported so callers need only this crate
pub use boxkit_core::{
    AccessToken, Authentication, BaseUrls, BoxError, BoxResult, DeveloperTokenAuth, Method, Page,
    RateLimitConfig, RequestBody,
};
pub use boxkit_net::ProxyConfig;

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
