//! `search` command handler.

use std::io::Write;

use serde_json::Value;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::ls::ITEM_FIELDS;
use crate::presentation::write_items_table;

/// Show the first page of search results.
pub async fn execute(
    ctx: &CliContext,
    query: &str,
    limit: u64,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    if query.trim().is_empty() {
        return Err(CliError::Arguments("Search query cannot be empty".to_string()));
    }

    let mut results = ctx
        .client()
        .search(query, Some(limit))
        .with_fields(ITEM_FIELDS);

    let Some(page) = results.next_page().await? else {
        writeln!(out, "No results for '{query}'")?;
        return Ok(());
    };

    write_items_table(out, &page.entries)?;
    let total = page.raw.get("total_count").and_then(Value::as_u64);
    match total {
        Some(total) => writeln!(out, "\nShowing {} of {total} result(s)", page.entries.len())?,
        None => writeln!(out, "\n{} result(s)", page.entries.len())?,
    }
    Ok(())
}
