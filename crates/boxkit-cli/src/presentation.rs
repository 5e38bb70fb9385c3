//! Terminal output helpers.
//!
//! Format-only: handlers fetch the data, these functions lay it out.

use std::io::Write;

use serde_json::Value;

use crate::error::CliError;

const ID_WIDTH: usize = 14;
const TYPE_WIDTH: usize = 12;
const NAME_WIDTH: usize = 48;

/// Truncates a string to a maximum number of characters, adding "..." if needed.
///
/// # Examples
///
/// ```rust
/// use boxkit_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// assert_eq!(truncate_string("Hello World", 8), "Hello...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Pretty-print a JSON value.
pub fn write_json(out: &mut dyn Write, value: &Value) -> Result<(), CliError> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Print Box items (files, folders, web links, users) as an aligned table.
pub fn write_items_table(out: &mut dyn Write, items: &[Value]) -> Result<(), CliError> {
    writeln!(
        out,
        "{:<ID_WIDTH$} {:<TYPE_WIDTH$} {}",
        "ID", "TYPE", "NAME"
    )?;
    writeln!(out, "{}", "-".repeat(ID_WIDTH + TYPE_WIDTH + NAME_WIDTH + 2))?;

    for item in items {
        writeln!(
            out,
            "{:<ID_WIDTH$} {:<TYPE_WIDTH$} {}",
            field(item, "id"),
            field(item, "type"),
            truncate_string(field(item, "name"), NAME_WIDTH)
        )?;
    }
    Ok(())
}

fn field<'a>(item: &'a Value, name: &str) -> &'a str {
    item.get(name).and_then(Value::as_str).unwrap_or("-")
}
