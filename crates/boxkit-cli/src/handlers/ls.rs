//! `ls` command handler.

use std::io::Write;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::write_items_table;

/// Fields requested for each listed item.
pub const ITEM_FIELDS: [&str; 3] = ["id", "type", "name"];

/// List every item in a folder, following all pages.
pub async fn execute(
    ctx: &CliContext,
    folder_id: &str,
    limit: Option<u64>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let items = ctx
        .client()
        .folder_items(folder_id, limit)
        .with_fields(ITEM_FIELDS)
        .all()
        .await?;

    write_items_table(out, &items)?;
    writeln!(out, "\n{} item(s)", items.len())?;
    Ok(())
}
