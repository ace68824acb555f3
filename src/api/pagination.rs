use serde::Serialize;
use serde_json::Value;

use crate::config;
use crate::filter::FilterData;

/// 1-based page window, `limit` capped at `api.max_page_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self::with_default_limit(page, limit, config::config().api.default_page_size)
    }

    pub fn with_default_limit(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        let max = config::config().api.max_page_size;
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, max),
        }
    }

    /// Saturates for pages far past the end, which then come back empty
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Filter for this page of `where_clause` in `order`
    pub fn filter(&self, where_clause: Value, order: &str) -> FilterData {
        FilterData::matching(where_clause)
            .order(order)
            .page(self.limit, self.offset())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: &PageRequest, returned: usize, total: u64) -> Self {
        let total_i = total as i64;
        Self {
            current_page: request.page,
            total_pages: (total_i + request.limit - 1) / request.limit,
            total,
            has_next: request.offset().saturating_add(returned as i64) < total_i,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, request: &PageRequest) -> Self {
        let pagination = Pagination::new(request, items.len(), total);
        Self { items, pagination }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let request = PageRequest::new(Some(2), Some(10));
        assert_eq!(request.offset(), 10);
        let pagination = Pagination::new(&request, 10, 25);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);

        let last = Pagination::new(&PageRequest::new(Some(3), Some(10)), 5, 25);
        assert!(!last.has_next);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let request = PageRequest::new(Some(0), Some(-4));
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 1);
        let empty = Pagination::new(&request, 0, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn huge_page_numbers_saturate() {
        let request = PageRequest::new(Some(i64::MAX), Some(10));
        assert_eq!(request.offset(), i64::MAX);
        let pagination = Pagination::new(&request, 0, 25);
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);
    }
}
