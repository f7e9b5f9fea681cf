//! Bounded result pages.

use crate::query::plan::PageWindow;
use serde::{Deserialize, Serialize};

/// One slice of a larger result set plus pagination metadata.
///
/// `has_next` is `offset + page_size < total_elements`; for page-number
/// windows this equals `(page_index + 1) * page_size < total_elements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub is_first: bool,
    pub has_next: bool,
}

impl<T> ResultPage<T> {
    pub(crate) fn windowed(content: Vec<T>, window: PageWindow, total_elements: u64) -> Self {
        Self {
            content,
            total_elements,
            page_index: window.index,
            page_size: window.size,
            is_first: window.offset == 0,
            has_next: window.offset.saturating_add(window.size) < total_elements,
        }
    }

    /// A single page holding the whole result.
    pub(crate) fn unpaged(content: Vec<T>) -> Self {
        let total = content.len() as u64;
        Self {
            content,
            total_elements: total,
            page_index: 0,
            page_size: total,
            is_first: true,
            has_next: false,
        }
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total_elements.div_ceil(self.page_size)
    }

    pub fn has_previous(&self) -> bool {
        !self.is_first
    }

    pub fn is_last(&self) -> bool {
        !self.has_next
    }

    /// Fallible [`ResultPage::map`]; stops at the first error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<ResultPage<U>, E> {
        let content = self.content.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(ResultPage {
            content,
            total_elements: self.total_elements,
            page_index: self.page_index,
            page_size: self.page_size,
            is_first: self.is_first,
            has_next: self.has_next,
        })
    }

    /// Converts the content while keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResultPage<U> {
        ResultPage {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            page_index: self.page_index,
            page_size: self.page_size,
            is_first: self.is_first,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResultPage;
    use crate::query::plan::PageWindow;

    fn window(index: u64, size: u64) -> PageWindow {
        PageWindow {
            index,
            size,
            offset: index * size,
        }
    }

    #[test]
    fn second_page_of_five_by_three_is_last() {
        let page = ResultPage::windowed(vec![4, 5], window(1, 3), 5);
        assert!(!page.is_first);
        assert!(!page.has_next);
        assert_eq!(page.total_pages(), 2);
        assert!(page.has_previous());
    }

    #[test]
    fn first_page_reports_next() {
        let page = ResultPage::windowed(vec![1, 2, 3], window(0, 3), 5);
        assert!(page.is_first);
        assert!(page.has_next);
    }

    #[test]
    fn exact_fill_has_no_next() {
        let page = ResultPage::windowed(vec![4, 5, 6], window(1, 3), 6);
        assert!(!page.has_next);
    }

    #[test]
    fn unpaged_is_single_page() {
        let page = ResultPage::unpaged(vec!["a", "b"]);
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.total_pages(), 1);
        assert!(page.is_last());

        let empty: ResultPage<u8> = ResultPage::unpaged(Vec::new());
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next);
    }

    #[test]
    fn try_map_stops_at_first_error() {
        let page = ResultPage::windowed(vec!["1", "x", "3"], window(0, 3), 3);
        assert!(page.clone().try_map(str::parse::<u8>).is_err());

        let parsed = ResultPage::windowed(vec!["1", "2"], window(0, 2), 5)
            .try_map(str::parse::<u8>)
            .unwrap();
        assert_eq!(parsed.content, vec![1, 2]);
        assert!(parsed.has_next);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = ResultPage::windowed(vec![1, 2], window(2, 2), 7).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20]);
        assert_eq!(page.page_index, 2);
        assert_eq!(page.total_elements, 7);
        assert!(page.has_next);
    }
}
