// src/catalog/page.rs
//! Page window over a filtered list.

use serde::{Deserialize, Serialize};

/// Current page (1-indexed) and a positive page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
}

/// `ceil(count / page_size)`, never less than 1.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    ((count + page_size - 1) / page_size).max(1)
}

impl PageWindow {
    /// A zero page size is raised to 1. The page is kept as given.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size: page_size.max(1) }
    }

    pub fn first(page_size: usize) -> Self {
        Self::new(1, page_size)
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Clamp into `[1, max(1, total_pages)]`.
    pub fn clamped(self, total_pages: usize) -> Self {
        Self {
            page: self.page.clamp(1, total_pages.max(1)),
            page_size: self.page_size,
        }
    }

    pub fn offset(&self) -> Option<usize> {
        self.page.checked_sub(1)?.checked_mul(self.page_size)
    }

    pub fn slice<'s, T>(&self, items: &'s [T]) -> &'s [T] {
        let Some(start) = self.offset() else {
            return &[];
        };
        if start >= items.len() {
            return &[];
        }
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }
}
