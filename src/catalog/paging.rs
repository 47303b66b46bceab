//! Pagination
//!
//! Maps `(page, per_page)` requests onto a window of an ordered key list.
//! Pages are 1-based; the last page may be shorter than `per_page`, and a
//! page past the end is an empty window rather than an error.

/// Normalise paging parameters.
///
/// A zero page becomes the first page; a zero or oversized `per_page`
/// becomes `max_per_page`.
pub fn validate_paging_params(page: usize, per_page: usize, max_per_page: usize) -> (usize, usize) {
    let max_per_page = max_per_page.max(1);
    let page = page.max(1);
    let per_page = if per_page == 0 || per_page > max_per_page {
        max_per_page
    } else {
        per_page
    };
    (page, per_page)
}

/// Return the slice of `keys` shown on `page`.
pub fn window_of<T>(keys: &[T], page: usize, per_page: usize, max_per_page: usize) -> &[T] {
    let (page, per_page) = validate_paging_params(page, per_page, max_per_page);
    let total = keys.len();
    let full_pages = total / per_page;

    if page == 1 {
        &keys[..per_page.min(total)]
    } else if page == full_pages + 1 {
        // overhang page: whatever is left after the full pages
        &keys[per_page * (page - 1)..]
    } else if page <= full_pages && page * per_page <= total {
        &keys[(page - 1) * per_page..page * per_page]
    } else {
        &[]
    }
}

/// Number of pages needed to show `total` units.
pub fn page_count(total: usize, per_page: usize, max_per_page: usize) -> usize {
    let (_, per_page) = validate_paging_params(1, per_page, max_per_page);
    total.div_ceil(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_param_normalisation() {
        assert_eq!(validate_paging_params(0, 0, 100), (1, 100));
        assert_eq!(validate_paging_params(3, 500, 100), (3, 100));
        assert_eq!(validate_paging_params(2, 10, 100), (2, 10));
        assert_eq!(validate_paging_params(1, 0, 0), (1, 1));
    }

    #[test]
    fn test_first_page() {
        let k = keys(11);
        assert_eq!(window_of(&k, 1, 2, 100), &[0, 1]);
        assert_eq!(window_of(&k, 0, 2, 100), &[0, 1]);
        assert_eq!(window_of(&k, 1, 50, 100).len(), 11);
    }

    #[test]
    fn test_middle_and_last_page() {
        let k = keys(11);
        assert_eq!(window_of(&k, 2, 5, 100), &[5, 6, 7, 8, 9]);
        assert_eq!(window_of(&k, 3, 5, 100), &[10]);
        assert_eq!(window_of(&k, 4, 3, 100), &[9, 10]);
    }

    #[test]
    fn test_beyond_last_page() {
        let k = keys(11);
        assert!(window_of(&k, 5, 3, 100).is_empty());
        assert!(window_of(&k, 100, 3, 100).is_empty());
    }

    #[test]
    fn test_evenly_divisible_total() {
        let k = keys(10);
        assert_eq!(window_of(&k, 2, 5, 100), &[5, 6, 7, 8, 9]);
        // page right after the last full page is empty
        assert!(window_of(&k, 3, 5, 100).is_empty());
    }

    #[test]
    fn test_empty_keys() {
        let k: Vec<usize> = Vec::new();
        assert!(window_of(&k, 1, 10, 100).is_empty());
        assert!(window_of(&k, 2, 10, 100).is_empty());
    }

    #[test]
    fn test_per_page_capped_by_max() {
        let k = keys(30);
        assert_eq!(window_of(&k, 1, 50, 10).len(), 10);
        assert_eq!(window_of(&k, 3, 50, 10), &k[20..30]);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(11, 5, 100), 3);
        assert_eq!(page_count(10, 5, 100), 2);
        assert_eq!(page_count(0, 5, 100), 0);
        assert_eq!(page_count(250, 0, 100), 3);
    }
}
