//! Page cursor over the canonical publication list.

use std::num::NonZeroUsize;

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(6).unwrap();

/// Current page number (1-based) and fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    page: usize,
    page_size: NonZeroUsize,
}

/// Display window derived from a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub displayed: &'a [T],
    pub has_more: bool,
}

impl PageCursor {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self { page: 1, page_size }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn advance(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    pub fn slice<'a, T>(&self, canonical: &'a [T]) -> Page<'a, T> {
        page(canonical, self.page_size, self.page)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// `displayed = canonical[0 .. page * page_size]`, `has_more = len > page * page_size`.
pub fn page<T>(canonical: &[T], page_size: NonZeroUsize, page_number: usize) -> Page<'_, T> {
    let boundary = page_number.saturating_mul(page_size.get());
    let end = boundary.min(canonical.len());
    Page {
        displayed: &canonical[..end],
        has_more: canonical.len() > boundary,
    }
}
