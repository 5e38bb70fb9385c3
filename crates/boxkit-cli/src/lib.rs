#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// ============================================================================
// Public API
// ============================================================================

pub use bootstrap::{bootstrap, CliConfig, CliContext};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;

use std::io::Write;

/// Run a parsed command against a composed context.
pub async fn dispatch(
    ctx: &CliContext,
    command: Commands,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Commands::Me => handlers::me::execute(ctx, out).await,
        Commands::Get { endpoint, params } => {
            handlers::get::execute(ctx, &endpoint, &params, out).await
        }
        Commands::Ls { folder_id, limit } => {
            handlers::ls::execute(ctx, &folder_id, limit, out).await
        }
        Commands::Search { query, limit } => {
            handlers::search::execute(ctx, &query, limit, out).await
        }
    }
}

// Used only by the binary target
use anyhow as _;
use dotenvy as _;
use tokio as _;
use tracing_subscriber as _;

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
