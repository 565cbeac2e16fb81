//! Page-number pagination shared by the listing endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// Listing pages hold ten records
pub const DEFAULT_PER_PAGE: i64 = 10;

/// `?page=N` query parameter (1-based)
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Resolved page window handed to the storage layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: i64) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        // The offset of an accepted page always fits in an i64
        let reachable = page >= 1
            && (page - 1)
                .checked_mul(per_page)
                .and_then(|offset| offset.checked_add(per_page))
                .is_some();
        if !reachable {
            return Err(AppError::NotFound(format!("Invalid page ({})", page)));
        }
        Ok(Self { page, per_page })
    }

    pub fn from_query(query: &PageQuery) -> AppResult<Self> {
        Self::new(query.page, DEFAULT_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Records of `[offset, offset + per_page)` clipped to a hard `cap`
    pub fn window(&self, cap: Option<i64>) -> (i64, i64) {
        let offset = self.offset();
        let limit = match cap {
            Some(cap) => (cap - offset).clamp(0, self.per_page),
            None => self.per_page,
        };
        (offset, limit)
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Records on this page
    pub items: Vec<T>,
    /// Total number of records across all pages
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Records per page
    pub per_page: i64,
    /// Number of pages (at least one, even when empty)
    pub num_pages: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Wrap a fetched page, rejecting pages past the end
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> AppResult<Self> {
        let num_pages = num_pages(total, request.per_page);
        if request.page > num_pages {
            return Err(AppError::NotFound(format!(
                "Invalid page ({}): that page contains no results",
                request.page
            )));
        }

        Ok(Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            num_pages,
        })
    }
}

fn num_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::genre::Genre;

    #[test]
    fn test_page_zero_is_rejected() {
        assert!(matches!(PageRequest::new(Some(0), 10), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_page_beyond_any_offset_is_rejected() {
        assert!(matches!(PageRequest::new(Some(i64::MAX), 10), Err(AppError::NotFound(_))));

        let last = i64::MAX / 10;
        assert!(matches!(PageRequest::new(Some(last + 1), 10), Err(AppError::NotFound(_))));
        assert_eq!(PageRequest::new(Some(last), 10).unwrap().offset(), (last - 1) * 10);
    }

    #[test]
    fn test_window_respects_cap() {
        let second = PageRequest::new(Some(2), 10).unwrap();
        assert_eq!(second.window(Some(20)), (10, 10));
        assert_eq!(second.window(Some(15)), (10, 5));

        let third = PageRequest::new(Some(3), 10).unwrap();
        assert_eq!(third.window(Some(20)), (20, 0));
        assert_eq!(third.window(None), (20, 10));
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page = PaginatedResponse::<Genre>::new(vec![], 0, PageRequest::new(None, 10).unwrap())
            .unwrap();
        assert_eq!(page.num_pages, 1);

        let past_end = PaginatedResponse::<Genre>::new(vec![], 0, PageRequest::new(Some(2), 10).unwrap());
        assert!(matches!(past_end, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_num_pages_rounds_up() {
        assert_eq!(num_pages(10, 10), 1);
        assert_eq!(num_pages(11, 10), 2);
        assert_eq!(num_pages(20, 10), 2);
    }
}
