//! Offset pagination.

use serde::Serialize;

/// Page size used when none (or garbage) is supplied.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A normalized page request: `page >= 1`, `limit` in `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a page request, clamping out-of-range values.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        let limit = if limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            limit.min(MAX_PAGE_SIZE)
        };
        Self {
            page: page.max(1),
            limit,
        }
    }

    /// Parse raw query-string values; anything unparsable falls back to defaults.
    #[must_use]
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page.and_then(|p| p.trim().parse().ok()).unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(page, limit)
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub reviews: Vec<T>,
    /// Total matching items across all pages.
    pub total: i64,
    /// One-based page number.
    pub page: u32,
    /// Number of pages, `ceil(total / limit)`.
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page from its items and the total count.
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let limit = i64::from(request.limit());
        Self {
            reviews: items,
            total,
            page: request.page(),
            total_pages: (total + limit - 1) / limit,
        }
    }
}
