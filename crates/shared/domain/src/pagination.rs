//! Page coordinates for list and search queries.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, FIRST_PAGE, MAX_PAGE_SIZE};
use crate::error::{DomainError, DomainResult};

/// A validated (page, page_size) pair. Pages are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    /// Validate raw page coordinates.
    ///
    /// `page` must be at least 1 and `page_size` within `1..=MAX_PAGE_SIZE`.
    pub fn new(page: i64, page_size: i64) -> DomainResult<Self> {
        if page < FIRST_PAGE as i64 || page_size < 1 || (page_size as u64) > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidPagination);
        }
        Ok(Self {
            page: page as u64,
            page_size: page_size as u64,
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Zero-based page index, as expected by paginators
    pub fn index(&self) -> u64 {
        self.page - 1
    }

    /// Row offset of the first item on this page.
    ///
    /// `None` when the offset does not fit a SQL `BIGINT`; such a page lies
    /// past any stored row and is always empty.
    pub fn offset(&self) -> Option<u64> {
        self.index()
            .checked_mul(self.page_size)
            .filter(|offset| *offset <= i64::MAX as u64)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: FIRST_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
