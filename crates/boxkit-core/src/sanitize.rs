//! Redaction of secrets before headers and bodies reach logs or errors.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

/// Replacement text for redacted values.
pub const REDACTED: &str = "---[redacted]---";

const SENSITIVE_KEYS: &[&str] = &[
    "authorization",
    "access_token",
    "refresh_token",
    "subject_token",
    "token",
    "client_id",
    "client_secret",
    "shared_link",
    "download_url",
    "jwt_private_key",
    "jwt_private_key_passphrase",
    "password",
];

/// Redacts sensitive header values and JSON body fields.
///
/// Keys are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct DataSanitizer {
    keys: BTreeSet<String>,
}

impl Default for DataSanitizer {
    fn default() -> Self {
        Self {
            keys: SENSITIVE_KEYS.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

impl DataSanitizer {
    /// Create a sanitizer with the default set of sensitive keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another key to redact.
    #[must_use]
    pub fn with_key(mut self, key: impl AsRef<str>) -> Self {
        self.keys.insert(key.as_ref().to_ascii_lowercase());
        self
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.keys.contains(&key.to_ascii_lowercase())
    }

    /// Return a copy of `headers` with sensitive values replaced.
    pub fn sanitize_headers(&self, headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                let value = if self.is_sensitive(name) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Return a copy of `body` with sensitive fields replaced, recursively.
    pub fn sanitize_body(&self, body: &Value) -> Value {
        match body {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| {
                        let value = if self.is_sensitive(key) {
                            Value::String(REDACTED.to_string())
                        } else {
                            self.sanitize_body(value)
                        };
                        (key.clone(), value)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.sanitize_body(v)).collect()),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_are_redacted_case_insensitively() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer abc".to_string());
        headers.insert("User-Agent".to_string(), "boxkit".to_string());

        let clean = DataSanitizer::default().sanitize_headers(&headers);
        assert_eq!(clean["Authorization"], REDACTED);
        assert_eq!(clean["User-Agent"], "boxkit");
    }

    #[test]
    fn test_nested_body_fields_are_redacted() {
        let body = json!({
            "id": "123",
            "shared_link": {"url": "https://app.box.com/s/xyz"},
            "entries": [{"download_url": "https://dl.box.com/1", "name": "a.txt"}],
            "auth": {"client_secret": "shh"}
        });

        let clean = DataSanitizer::default().sanitize_body(&body);
        assert_eq!(clean["id"], "123");
        assert_eq!(clean["shared_link"], REDACTED);
        assert_eq!(clean["entries"][0]["download_url"], REDACTED);
        assert_eq!(clean["entries"][0]["name"], "a.txt");
        assert_eq!(clean["auth"]["client_secret"], REDACTED);
    }

    #[test]
    fn test_custom_key() {
        let sanitizer = DataSanitizer::new().with_key("X-Secret");
        assert!(sanitizer.is_sensitive("x-secret"));
        assert!(!sanitizer.is_sensitive("x-public"));
    }
}
