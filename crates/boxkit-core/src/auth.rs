//! Authentication port.
//!
//! The network layer only needs an `Authorization` header and a way to
//! refresh it after a 401. Interactive flows (OAuth2, JWT, CCG) plug in by
//! implementing [`Authentication`]; boxkit ships the developer-token variant.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, BoxResult};

/// An OAuth2 access token as returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AccessToken {
    /// A bare bearer token with no expiry or refresh information.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in: None,
            token_type: Some("bearer".to_string()),
            refresh_token: None,
        }
    }
}

/// Where an [`Authentication`] keeps its current token.
pub trait TokenStorage: Send + Sync {
    fn store(&self, token: AccessToken);
    fn get(&self) -> Option<AccessToken>;
    fn clear(&self);
}

/// Process-local token storage.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    token: RwLock<Option<AccessToken>>,
}

impl InMemoryTokenStorage {
    pub fn new(token: Option<AccessToken>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

impl TokenStorage for InMemoryTokenStorage {
    fn store(&self, token: AccessToken) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn get(&self) -> Option<AccessToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Port trait for anything that can authorize API calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authentication: Send + Sync {
    /// The current token, fetching one if none is cached.
    async fn retrieve_token(&self) -> BoxResult<AccessToken>;

    /// Obtain a fresh token, replacing the cached one.
    async fn refresh_token(&self) -> BoxResult<AccessToken>;

    /// Value for the `Authorization` header.
    async fn retrieve_authorization_header(&self) -> BoxResult<String> {
        let token = self.retrieve_token().await?;
        Ok(format!("Bearer {}", token.access_token))
    }
}

/// Authentication with a fixed developer token.
///
/// Developer tokens expire after an hour and cannot be refreshed, so a 401
/// surfaces as an auth error instead of a retry loop.
pub struct DeveloperTokenAuth {
    storage: InMemoryTokenStorage,
}

impl std::fmt::Debug for DeveloperTokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeveloperTokenAuth")
            .field("has_token", &self.storage.get().is_some())
            .finish()
    }
}

impl DeveloperTokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            storage: InMemoryTokenStorage::new(Some(AccessToken::bearer(token))),
        }
    }

    /// Drop the stored token; later calls fail with an auth error.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

#[async_trait]
impl Authentication for DeveloperTokenAuth {
    async fn retrieve_token(&self) -> BoxResult<AccessToken> {
        self.storage
            .get()
            .ok_or_else(|| BoxError::auth("No access token is available."))
    }

    async fn refresh_token(&self) -> BoxResult<AccessToken> {
        Err(BoxError::auth(
            "Developer token has expired. Please provide a new one.",
        ))
    }
}
