//! Subcommand definitions.

use clap::Subcommand;

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the authenticated user
    Me,

    /// GET any API endpoint and print the JSON response
    Get {
        /// Endpoint path relative to the API root (e.g. "folders/0") or a full URL
        endpoint: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// List every item in a folder
    Ls {
        /// Folder ID; "0" is the root folder
        #[arg(default_value = "0")]
        folder_id: String,
        /// Page size used while listing
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Show the first page of search results
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 20)]
        limit: u64,
    },
}

/// Parse a `key=value` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("fields=id,name").unwrap(),
            ("fields".to_string(), "id,name".to_string())
        );
        assert_eq!(
            parse_key_val("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_key_val("empty=").unwrap().1, "");
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }
}
