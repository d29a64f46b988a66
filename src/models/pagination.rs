//! Shared pagination envelope and lenient query parsing.

use serde::{Deserialize, Serialize};

/// Pagination metadata returned alongside every paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(total_items: i64, current_page: i64, limit: i64) -> Self {
        Self {
            total_items,
            total_pages: (total_items + limit - 1) / limit,
            current_page,
            limit,
        }
    }
}

/// Raw `page`/`limit` query parameters.
///
/// Values are kept as strings so that non-numeric input falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

impl PageQuery {
    /// Resolve to `(page, limit)`, substituting defaults for anything
    /// missing, non-numeric, or non-positive.
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        let page = parse_positive(self.page.as_deref()).unwrap_or(1);
        let limit = parse_positive(self.limit.as_deref()).unwrap_or(default_limit);
        (page, limit)
    }
}

fn parse_positive(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.parse::<i64>().ok()).filter(|n| *n > 0)
}
