//! Page arithmetic for list endpoints.

use serde::Serialize;

/// Page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Sanitized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number (1-indexed).
    pub page: i64,
    /// Rows per page.
    pub page_size: i64,
}

impl PageRequest {
    /// Clamp caller input: page to at least 1, size to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// SQL offset for this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of results with totals.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Rows across all pages.
    pub total: i64,
    /// Current page (1-indexed).
    pub page: i64,
    /// Rows per page.
    pub page_size: i64,
    /// Number of pages; 0 when there are no rows.
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page from a query result.
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages: (total + request.page_size - 1) / request.page_size,
        }
    }
}
