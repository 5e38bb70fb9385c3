//! Paged collection endpoints.
//!
//! A [`Collection`] pairs a URL with a paging cursor and fetches one page per
//! [`next_page`](Collection::next_page) call.

use boxkit_core::{BoxResult, MarkerCursor, OffsetCursor, Page, PageCursor};
use serde_json::Value;
use tracing::debug;

use super::{BoxClient, RequestOptions};

/// Collection paged by `marker` / `next_marker`.
pub type MarkerCollection = Collection<MarkerCursor>;

/// Collection paged by `limit` / `offset`.
pub type OffsetCollection = Collection<OffsetCursor>;

#[derive(Debug, Clone)]
pub struct Collection<C> {
    client: BoxClient,
    url: String,
    cursor: C,
    fields: Vec<String>,
    params: Vec<(String, String)>,
}

impl<C: PageCursor> Collection<C> {
    pub fn new(client: BoxClient, url: impl Into<String>, cursor: C) -> Self {
        Self {
            client,
            url: url.into(),
            cursor,
            fields: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Ask for specific fields on each entry.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Extra query parameter sent with every page request.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub const fn cursor(&self) -> &C {
        &self.cursor
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    /// Query parameters of the next page request.
    pub fn page_params(&self) -> Vec<(String, String)> {
        let mut params = self.params.clone();
        if !self.fields.is_empty() {
            params.push(("fields".to_string(), self.fields.join(",")));
        }
        params.extend(self.cursor.params());
        params
    }

    /// Fetch the next page, or `None` once the collection is exhausted.
    pub async fn next_page(&mut self) -> BoxResult<Option<Page<Value>>> {
        if !self.cursor.has_more() {
            return Ok(None);
        }

        let params = self.page_params();
        debug!(url = %self.url, ?params, "Fetching page");
        let raw: Value = self
            .client
            .get(&self.url, RequestOptions::new().with_params(params))
            .await?
            .json()?;

        self.cursor.advance(&raw)?;
        Page::parse(raw).map(Some)
    }

    /// Fetch every remaining entry.
    pub async fn all(mut self) -> BoxResult<Vec<Value>> {
        let mut entries = Vec::new();
        while let Some(page) = self.next_page().await? {
            entries.extend(page.entries);
        }
        Ok(entries)
    }
}
