//! Convenience endpoints.

use boxkit_core::{BoxResult, MarkerCursor, OffsetCursor};
use serde_json::Value;

use super::{shared_link_header, BoxClient, MarkerCollection, OffsetCollection, RequestOptions};

impl BoxClient {
    /// The user the client is authenticated as (`GET /users/me`).
    pub async fn current_user(&self) -> BoxResult<Value> {
        self.get_json("users", &["me"]).await
    }

    /// Items in a folder. The root folder is `"0"`.
    pub fn folder_items(&self, folder_id: &str, limit: Option<u64>) -> OffsetCollection {
        OffsetCollection::new(
            self.clone(),
            self.get_url("folders", &[folder_id, "items"]),
            OffsetCursor::new(limit),
        )
    }

    /// Files and folders the user accessed recently.
    pub fn recent_items(&self, limit: Option<u32>) -> MarkerCollection {
        MarkerCollection::new(
            self.clone(),
            self.get_url::<&str>("recent_items", &[]),
            MarkerCursor::new(limit),
        )
    }

    /// Users of the enterprise. Add `filter_term` or `user_type` with
    /// [`with_param`](super::Collection::with_param).
    pub fn users(&self, limit: Option<u64>) -> OffsetCollection {
        OffsetCollection::new(
            self.clone(),
            self.get_url::<&str>("users", &[]),
            OffsetCursor::new(limit),
        )
    }

    /// Full-text search.
    pub fn search(&self, query: &str, limit: Option<u64>) -> OffsetCollection {
        OffsetCollection::new(
            self.clone(),
            self.get_url::<&str>("search", &[]),
            OffsetCursor::new(limit),
        )
        .with_param("query", query)
    }

    /// The item behind a shared link.
    pub async fn get_shared_item(&self, shared_link: &str, password: Option<&str>) -> BoxResult<Value> {
        let url = self.get_url::<&str>("shared_items", &[]);
        self.get(
            &url,
            RequestOptions::new().with_header("BoxApi", shared_link_header(shared_link, password)),
        )
        .await?
        .json()
    }
}
