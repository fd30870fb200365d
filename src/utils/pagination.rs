// src/utils/pagination.rs

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Page/limit window derived from optional query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based.
    pub page: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Missing or non-positive values fall back to page 1 and the default size.
    /// The limit is capped at `MAX_PAGE_SIZE`.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total + self.limit - 1) / self.limit
    }
}

/// Wraps a search term for an `ILIKE` pattern, escaping wildcards.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_caps() {
        assert_eq!(PageWindow::new(None, None), PageWindow { page: 1, limit: DEFAULT_PAGE_SIZE });
        assert_eq!(PageWindow::new(Some(0), Some(-5)).page, 1);
        assert_eq!(PageWindow::new(Some(2), Some(10_000)).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn offsets_and_page_counts() {
        let window = PageWindow::new(Some(3), Some(10));
        assert_eq!(window.offset(), 20);
        assert_eq!(window.total_pages(0), 0);
        assert_eq!(window.total_pages(10), 1);
        assert_eq!(window.total_pages(21), 3);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("GDP"), "%GDP%");
        assert_eq!(like_pattern("100%_sure"), "%100\\%\\_sure%");
    }
}
