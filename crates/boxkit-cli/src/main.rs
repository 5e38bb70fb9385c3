//! CLI entry point.
//!
//! Loads `.env`, parses arguments, initialises logging, composes the client
//! via bootstrap and dispatches to the command handlers.

use std::io;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use boxkit_cli::{bootstrap, dispatch, Cli, CliConfig, CliError};

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = CliConfig {
        token: cli.token,
        as_user: cli.as_user,
    };
    let ctx = bootstrap(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    dispatch(&ctx, cli.command, &mut out).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads BOX_DEVELOPER_TOKEN
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    if let Err(err) = run(cli).await {
        tracing::debug!(error = ?err, "Command failed");
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}
