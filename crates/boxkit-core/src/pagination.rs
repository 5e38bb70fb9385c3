//! Cursor state for the two Box paging styles.
//!
//! These types only compute query parameters and digest response pages; the
//! client crate owns the request loop.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{BoxError, BoxResult};

/// One page of a collection endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub entries: Vec<T>,
    /// The full response body, for paging metadata and extra fields
    pub raw: Value,
}

impl<T: DeserializeOwned> Page<T> {
    /// Parse a collection response. The body must carry an `entries` array.
    pub fn parse(raw: Value) -> BoxResult<Self> {
        let entries = raw
            .get("entries")
            .and_then(Value::as_array)
            .ok_or_else(|| BoxError::InvalidResponse {
                message: "Collection response is missing an 'entries' array".to_string(),
            })?
            .iter()
            .map(|entry| T::deserialize(entry))
            .collect::<Result<Vec<T>, _>>()?;

        Ok(Self { entries, raw })
    }
}

/// Shared behaviour of the paging cursors.
pub trait PageCursor: Send {
    /// Query parameters for the next request.
    fn params(&self) -> Vec<(String, String)>;

    /// Digest a page that was fetched with [`params`](Self::params).
    fn advance(&mut self, page: &Value) -> BoxResult<()>;

    /// Whether another request should be made.
    fn has_more(&self) -> bool;
}

// ============================================================================
// Marker paging
// ============================================================================

/// Cursor for endpoints paged by `marker` / `next_marker`.
#[derive(Debug, Clone, Default)]
pub struct MarkerCursor {
    limit: Option<u32>,
    marker: Option<String>,
    /// Endpoints that support both styles need `usemarker=true`
    use_marker: bool,
    exhausted: bool,
}

impl MarkerCursor {
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Start from a marker returned by an earlier listing.
    #[must_use]
    pub fn starting_at(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Ask a dual-style endpoint for marker paging.
    #[must_use]
    pub const fn with_use_marker(mut self) -> Self {
        self.use_marker = true;
        self
    }

    /// The marker the next request will send.
    pub fn next_marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Extract the next marker from a page.
    ///
    /// Endpoints signal the last page inconsistently: an empty string, a
    /// `null`, or no field at all. All three mean there is nothing more.
    fn marker_from(page: &Value) -> Option<String> {
        page.get("next_marker")
            .and_then(Value::as_str)
            .filter(|marker| !marker.is_empty())
            .map(str::to_string)
    }
}

impl PageCursor for MarkerCursor {
    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if self.use_marker {
            params.push(("usemarker".to_string(), "true".to_string()));
        }
        if let Some(ref marker) = self.marker {
            params.push(("marker".to_string(), marker.clone()));
        }
        params
    }

    fn advance(&mut self, page: &Value) -> BoxResult<()> {
        self.marker = Self::marker_from(page);
        self.exhausted = self.marker.is_none();
        Ok(())
    }

    fn has_more(&self) -> bool {
        !self.exhausted
    }
}

// ============================================================================
// Limit/offset paging
// ============================================================================

/// Cursor for endpoints paged by `limit` / `offset` / `total_count`.
#[derive(Debug, Clone, Default)]
pub struct OffsetCursor {
    limit: Option<u64>,
    offset: u64,
    total_count: Option<u64>,
}

impl OffsetCursor {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn starting_at(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub const fn total_count(&self) -> Option<u64> {
        self.total_count
    }
}

impl PageCursor for OffsetCursor {
    fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("offset".to_string(), self.offset.to_string())];
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    fn advance(&mut self, page: &Value) -> BoxResult<()> {
        let total = page
            .get("total_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| BoxError::Pagination {
                message: "Offset page is missing 'total_count'".to_string(),
            })?;
        self.total_count = Some(total);

        // The server may clamp the requested limit; page with what it used.
        if let Some(reported) = page.get("limit").and_then(Value::as_i64) {
            match u64::try_from(reported) {
                Ok(limit) if limit > 0 => self.limit = Some(limit),
                _ => {
                    self.offset = total;
                    warn!(limit = reported, "API returned a non-positive limit, paging stopped");
                    return Err(BoxError::Pagination {
                        message: format!("API returned limit={reported}, cannot continue paging"),
                    });
                }
            }
        }
        if let Some(offset) = page.get("offset").and_then(Value::as_u64) {
            self.offset = offset;
        }

        // Without a limit on either side, step by the page size.
        let step = self.limit.unwrap_or_else(|| {
            page.get("entries")
                .and_then(Value::as_array)
                .map_or(0, |entries| entries.len() as u64)
        });

        // A page whose offset is past the end, or would overflow, ends paging.
        self.offset = match self.offset.checked_add(step) {
            Some(next) if step > 0 && next <= total => next,
            _ => total,
        };
        Ok(())
    }

    fn has_more(&self) -> bool {
        self.total_count.is_none_or(|total| self.offset < total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_parse() {
        let page: Page<Value> = Page::parse(json!({
            "entries": [{"id": "1"}, {"id": "2"}],
            "total_count": 2
        }))
        .unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.raw["total_count"], 2);

        let missing = Page::<Value>::parse(json!({"total_count": 0}));
        assert!(matches!(missing, Err(BoxError::InvalidResponse { .. })));
    }

    #[test]
    fn test_marker_params() {
        let cursor = MarkerCursor::new(Some(100)).with_use_marker().starting_at("abc");
        assert_eq!(
            cursor.params(),
            vec![
                ("limit".to_string(), "100".to_string()),
                ("usemarker".to_string(), "true".to_string()),
                ("marker".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_marker_end_of_listing_variants() {
        for last_page in [
            json!({"entries": [], "next_marker": ""}),
            json!({"entries": [], "next_marker": null}),
            json!({"entries": []}),
        ] {
            let mut cursor = MarkerCursor::new(None);
            assert!(cursor.has_more());
            cursor.advance(&last_page).unwrap();
            assert!(!cursor.has_more(), "{last_page}");
            assert!(cursor.next_marker().is_none());
        }
    }

    #[test]
    fn test_marker_follows_next_marker() {
        let mut cursor = MarkerCursor::new(Some(2));
        cursor
            .advance(&json!({"entries": [{}, {}], "next_marker": "m2"}))
            .unwrap();
        assert!(cursor.has_more());
        assert_eq!(cursor.next_marker(), Some("m2"));
        assert!(cursor.params().contains(&("marker".to_string(), "m2".to_string())));
    }

    #[test]
    fn test_offset_walks_pages() {
        let mut cursor = OffsetCursor::new(Some(2));
        assert!(cursor.has_more());
        assert_eq!(cursor.params()[0], ("offset".to_string(), "0".to_string()));

        cursor
            .advance(&json!({"entries": [{}, {}], "total_count": 5, "offset": 0, "limit": 2}))
            .unwrap();
        assert_eq!(cursor.offset(), 2);
        assert!(cursor.has_more());

        cursor
            .advance(&json!({"entries": [{}, {}], "total_count": 5, "offset": 2, "limit": 2}))
            .unwrap();
        assert_eq!(cursor.offset(), 4);

        cursor
            .advance(&json!({"entries": [{}], "total_count": 5, "offset": 4, "limit": 2}))
            .unwrap();
        assert_eq!(cursor.offset(), 5);
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_offset_adopts_server_limit() {
        let mut cursor = OffsetCursor::new(Some(5000));
        cursor
            .advance(&json!({"entries": [], "total_count": 3000, "offset": 0, "limit": 1000}))
            .unwrap();
        assert_eq!(cursor.limit(), Some(1000));
        assert_eq!(cursor.offset(), 1000);
    }

    #[test]
    fn test_offset_rejects_non_positive_limit() {
        let mut cursor = OffsetCursor::new(Some(100));
        let result = cursor.advance(&json!({"entries": [], "total_count": 10, "limit": 0}));
        assert!(matches!(result, Err(BoxError::Pagination { .. })));
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_offset_without_limit_steps_by_page_size() {
        let mut cursor = OffsetCursor::new(None);
        assert_eq!(cursor.params().len(), 1);
        cursor
            .advance(&json!({"entries": [{}, {}, {}], "total_count": 4}))
            .unwrap();
        assert_eq!(cursor.offset(), 3);
        assert!(cursor.has_more());
    }

    #[test]
    fn test_offset_from_server_cannot_overflow() {
        let mut cursor = OffsetCursor::new(Some(2));
        cursor
            .advance(&json!({"entries": [], "total_count": 5, "offset": u64::MAX, "limit": 2}))
            .unwrap();
        assert_eq!(cursor.offset(), 5);
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_offset_requires_total_count() {
        let mut cursor = OffsetCursor::new(Some(10));
        assert!(matches!(
            cursor.advance(&json!({"entries": []})),
            Err(BoxError::Pagination { .. })
        ));
    }
}
