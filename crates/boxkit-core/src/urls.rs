//! Base URLs of the Box API hosts.

/// API version segment appended to the base URL.
pub const API_VERSION: &str = "2.0";

/// Hosts the client talks to. Override them to target a proxy or mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrls {
    pub base_url: String,
    pub upload_url: String,
    pub oauth2_url: String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            base_url: "https://api.box.com".to_string(),
            upload_url: "https://upload.box.com/api".to_string(),
            oauth2_url: "https://account.box.com/api/oauth2".to_string(),
        }
    }
}

impl BaseUrls {
    /// Build `"{base}/2.0/{endpoint}/{part}/..."`.
    ///
    /// Slashes at the joins are normalized so `"folders/"` and `"/folders"`
    /// produce the same URL.
    pub fn api_url<P: AsRef<str>>(&self, endpoint: &str, parts: &[P]) -> String {
        let mut url = format!(
            "{}/{API_VERSION}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_matches('/')
        );
        for part in parts {
            url.push('/');
            url.push_str(part.as_ref().trim_matches('/'));
        }
        url
    }

    /// Build `"{upload}/2.0/{endpoint}"`.
    pub fn upload_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{API_VERSION}/{}",
            self.upload_url.trim_end_matches('/'),
            endpoint.trim_matches('/')
        )
    }
}
