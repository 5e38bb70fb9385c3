//! CLI argument parser.

use clap::Parser;

use crate::commands::Commands;

/// boxkit - a small command line for the Box API
#[derive(Parser, Debug)]
#[command(name = "boxkit")]
#[command(about = "Query the Box content API from the command line")]
#[command(version)]
pub struct Cli {
    /// Developer token used to authorize requests
    #[arg(long, env = "BOX_DEVELOPER_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Run the command as another user (As-User header)
    #[arg(long = "as-user", global = true)]
    pub as_user: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
