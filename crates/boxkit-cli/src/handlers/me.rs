//! `me` command handler.

use std::io::Write;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::write_json;

/// Print the authenticated user.
pub async fn execute(ctx: &CliContext, out: &mut dyn Write) -> Result<(), CliError> {
    let user = ctx.client().current_user().await?;
    write_json(out, &user)
}
