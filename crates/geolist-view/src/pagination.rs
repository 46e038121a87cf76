//! Page slicing over the displayed subset.

use geolist_core::Record;

pub const DEFAULT_PAGE_SIZE: usize = 500;

/// 1-based page over the displayed subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    /// A zero page size is treated as one.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn page_count(&self, len: usize) -> usize {
        len.div_ceil(self.page_size)
    }

    /// Records on the current page. Pages past the end are empty.
    #[must_use]
    pub fn slice<'a>(&self, records: &'a [Record]) -> &'a [Record] {
        let start = (self.page - 1).saturating_mul(self.page_size);
        if start >= records.len() {
            return &[];
        }
        let end = (start + self.page_size).min(records.len());
        &records[start..end]
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Sets the page without range checks. Page 0 becomes 1.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Pulls the page back into `[1, page_count]`.
    pub fn clamp(&mut self, len: usize) {
        self.page = self.page.clamp(1, self.page_count(len).max(1));
    }
}
