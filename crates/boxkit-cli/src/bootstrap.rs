//! CLI bootstrap - the composition root.
//!
//! This module is the only place where the client is wired together for the
//! CLI: environment configuration, the developer-token authentication and the
//! optional `As-User` context. Command handlers receive the composed
//! [`CliContext`].

use std::sync::Arc;

use boxkit_client::{BoxClient, BoxClientConfig, DeveloperTokenAuth};
use tracing::debug;

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Developer token from `--token` or `BOX_DEVELOPER_TOKEN`.
    pub token: Option<String>,
    /// User ID to act as.
    pub as_user: Option<String>,
}

/// Fully composed context for CLI commands.
#[derive(Debug, Clone)]
pub struct CliContext {
    client: BoxClient,
}

impl CliContext {
    /// Wrap an already composed client.
    pub const fn from_client(client: BoxClient) -> Self {
        Self { client }
    }

    pub const fn client(&self) -> &BoxClient {
        &self.client
    }
}

/// Build the CLI context from the environment and command-line settings.
pub fn bootstrap(config: &CliConfig) -> Result<CliContext, CliError> {
    let token = config
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            CliError::Config(
                "No developer token given. Pass --token or set BOX_DEVELOPER_TOKEN.".to_string(),
            )
        })?;

    let client_config = BoxClientConfig::from_env()?;
    debug!(base_url = %client_config.base_urls().base_url, "Building Box client");

    let client = BoxClient::new(&client_config, Arc::new(DeveloperTokenAuth::new(token)))?;
    let client = match config.as_user.as_deref() {
        Some(user_id) => client.as_user(user_id),
        None => client,
    };

    Ok(CliContext::from_client(client))
}
