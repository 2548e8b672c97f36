use serde::Serialize;

/// Results shown per page of a result table.
pub const RESULTS_PER_PAGE: usize = 20;

/// One page of an in-memory result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Entry of the page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "lowercase")]
pub enum PageLink {
    Number(usize),
    Ellipsis,
}

pub fn total_pages(total_items: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    total_items.div_ceil(per_page)
}

/// Slices `items` to the requested 1-based page.
///
/// Out-of-range pages are clamped; an empty set always reports page 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = total_pages(items.len(), per_page);
    let page = page.clamp(1, total_pages.max(1));

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(items.len());
    let slice = if start < items.len() {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items: slice,
        page,
        per_page,
        total_items: items.len(),
        total_pages,
    }
}

/// Page selector: first, last and current ±1 as numbers, current ±2 as ellipses.
pub fn page_window(current: usize, total: usize) -> Vec<PageLink> {
    (1..=total)
        .filter_map(|page| {
            if page == 1 || page == total || page.abs_diff(current) <= 1 {
                Some(PageLink::Number(page))
            } else if page.abs_diff(current) == 2 {
                Some(PageLink::Ellipsis)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_slices() {
        let items: Vec<u32> = (0..45).collect();

        let first = paginate(&items, 1, RESULTS_PER_PAGE);
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.total_pages, 3);

        let last = paginate(&items, 3, RESULTS_PER_PAGE);
        assert_eq!(last.items, (40..45).collect::<Vec<_>>());
    }

    #[test]
    fn test_paginate_clamps() {
        let items: Vec<u32> = (0..5).collect();
        assert_eq!(paginate(&items, 0, 2).page, 1);
        assert_eq!(paginate(&items, 99, 2).page, 3);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 4, 20);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_page_window() {
        use PageLink::*;
        assert_eq!(
            page_window(5, 10),
            vec![
                Number(1),
                Ellipsis,
                Number(4),
                Number(5),
                Number(6),
                Ellipsis,
                Number(10)
            ]
        );
        assert_eq!(page_window(1, 3), vec![Number(1), Number(2), Number(3)]);
        assert_eq!(page_window(1, 0), Vec::<PageLink>::new());
    }
}
