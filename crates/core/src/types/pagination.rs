//! Page/limit pagination for list endpoints.

use serde::Serialize;

/// A normalized page request.
///
/// Out-of-range values are clamped rather than rejected: `page` is kept in
/// `1..=MAX_PAGE` and `limit` in `1..=100`, so `offset()` never overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_LIMIT;

    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, Self::MAX_PAGE),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    #[must_use]
    pub const fn page(&self) -> i64 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows to skip for SQL `OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    #[must_use]
    pub const fn new(request: PageRequest, total: i64) -> Self {
        let total = if total < 0 { 0 } else { total };
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: total / request.limit + if total % request.limit == 0 { 0 } else { 1 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let req = PageRequest::default();
        assert_eq!((req.page(), req.limit(), req.offset()), (1, 20, 0));

        let req = PageRequest::new(Some(0), Some(1000));
        assert_eq!((req.page(), req.limit()), (1, 100));

        let req = PageRequest::new(Some(-3), Some(0));
        assert_eq!((req.page(), req.limit()), (1, 1));
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn test_page_count() {
        let req = PageRequest::new(Some(1), Some(20));
        assert_eq!(Pagination::new(req, 0).pages, 0);
        assert_eq!(Pagination::new(req, 20).pages, 1);
        assert_eq!(Pagination::new(req, 21).pages, 2);
        assert_eq!(Pagination::new(req, -4).total, 0);
    }

    #[test]
    fn test_huge_page_is_capped() {
        let req = PageRequest::new(Some(i64::MAX), Some(100));
        assert_eq!(req.page(), PageRequest::MAX_PAGE);
        assert!(req.offset() >= 0);
        assert!(req.offset() <= i64::MAX - 100);
    }

    #[test]
    fn test_page_count_near_max_total() {
        let req = PageRequest::new(Some(1), Some(100));
        assert_eq!(Pagination::new(req, i64::MAX).pages, i64::MAX / 100 + 1);

        let req = PageRequest::new(Some(1), Some(1));
        assert_eq!(Pagination::new(req, i64::MAX).pages, i64::MAX);
    }
}
