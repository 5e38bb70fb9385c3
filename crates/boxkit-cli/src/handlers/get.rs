//! `get` command handler.

use std::io::Write;

use boxkit_client::RequestOptions;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::write_json;

/// GET an arbitrary endpoint and print the response body.
pub async fn execute(
    ctx: &CliContext,
    endpoint: &str,
    params: &[(String, String)],
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let client = ctx.client();
    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        client.get_url::<&str>(endpoint, &[])
    };

    let options = RequestOptions::new().with_params(params.iter().cloned());
    let response = client.get(&url, options).await?;

    match response.json_value() {
        Some(body) => write_json(out, body),
        None => {
            writeln!(out, "HTTP {} (no JSON body)", response.status())?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, output};
    use boxkit_net::testing::{error_body, FakeNetworkClient};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_relative_endpoint_with_params() {
        let fake = Arc::new(FakeNetworkClient::new().with_json(200, json!({"id": "0", "type": "folder"})));
        let params = vec![("fields".to_string(), "id,type".to_string())];
        let mut out = Vec::new();
        execute(&context(&fake), "/folders/0", &params, &mut out)
            .await
            .unwrap();

        let request = fake.last_request().unwrap();
        assert_eq!(request.url, "https://api.box.com/2.0/folders/0");
        assert_eq!(request.params, params);
        assert!(output(out).contains("\"type\": \"folder\""));
    }

    #[tokio::test]
    async fn test_absolute_url_is_used_as_is() {
        let fake = Arc::new(FakeNetworkClient::new().with_json(200, json!({"entries": []})));
        let mut out = Vec::new();
        execute(
            &context(&fake),
            "https://api.box.com/2.0/recent_items",
            &[],
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(
            fake.last_request().unwrap().url,
            "https://api.box.com/2.0/recent_items"
        );
    }

    #[tokio::test]
    async fn test_not_found_is_a_general_error() {
        let fake = Arc::new(
            FakeNetworkClient::new().with_json(404, error_body(404, "not_found", "Not Found")),
        );
        let mut out = Vec::new();
        let err = execute(&context(&fake), "files/999", &[], &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("404 Not Found"));
    }
}
