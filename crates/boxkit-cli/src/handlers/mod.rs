//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ..., out: &mut dyn Write) -> Result<(), CliError>`
//! - Call the client, then format the result with [`crate::presentation`]
//!
//! Output goes to the writer handed in so tests can capture it.

pub mod get;
pub mod ls;
pub mod me;
pub mod search;
