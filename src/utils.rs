// Pagination helpers shared by the public and admin route families.

use crate::{
    constants::{MAX_PAGE, MAX_PAGE_LIMIT},
    error::{AppError, Result},
    models::Pagination,
};

/// Clamp caller-supplied pagination into usable bounds. Never fails: the
/// public route family prefers defaults over rejections.
pub fn normalize_pagination(page: i64, limit: i64) -> (i64, i64) {
    (page.clamp(1, MAX_PAGE), limit.clamp(1, MAX_PAGE_LIMIT))
}

/// Build the pagination envelope for a page of results.
pub fn create_pagination(page: i64, limit: i64, total: i64) -> Pagination {
    let total_pages = if limit > 0 {
        (total + limit - 1) / limit
    } else {
        0
    };

    Pagination {
        page,
        limit,
        total,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1,
    }
}

/// Strict guard for the admin route family: invalid pagination is a 400,
/// not a silent default.
pub fn ensure_page_limit(page: i64, limit: i64) -> Result<()> {
    if page < 1 {
        return Err(AppError::BadRequest("page must be >= 1".to_string()));
    }
    if limit < 1 || limit > MAX_PAGE_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_pagination_clamps_low_inputs() {
        assert_eq!(normalize_pagination(0, 0), (1, 1));
        assert_eq!(normalize_pagination(-5, -10), (1, 1));
    }

    #[test]
    fn normalize_pagination_clamps_high_inputs() {
        assert_eq!(normalize_pagination(999_999_999, 150), (999_999, 100));
    }

    #[test]
    fn create_pagination_middle_page() {
        let pagination = create_pagination(2, 10, 25);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn create_pagination_boundary_pages() {
        let first = create_pagination(1, 10, 25);
        assert!(!first.has_prev);
        assert!(first.has_next);

        let last = create_pagination(3, 10, 25);
        assert!(last.has_prev);
        assert!(!last.has_next);
    }

    #[test]
    fn create_pagination_empty_result() {
        let pagination = create_pagination(1, 10, 0);
        assert_eq!(pagination.total_pages, 0);
        assert!(!pagination.has_next);
        assert!(!pagination.has_prev);
    }

    #[test]
    fn ensure_page_limit_rejects_out_of_range() {
        assert!(ensure_page_limit(0, 10).is_err());
        assert!(ensure_page_limit(1, 0).is_err());
        assert!(ensure_page_limit(1, 101).is_err());
        assert!(ensure_page_limit(1, 100).is_ok());
    }
}
