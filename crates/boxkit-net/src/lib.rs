#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

mod error;
mod http;
mod network;
mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// ============================================================================
// Public API
// ============================================================================

// Transport
pub use http::{ReqwestNetworkClient, TransportConfig, DEFAULT_TIMEOUT};

// Dispatch
pub use network::{Network, USER_AGENT, X_BOX_UA};

// Configuration
pub use session::{NetworkSession, ProxyConfig};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use wiremock as _;
