// src/handlers.rs
use serde::{Deserialize, Serialize};

use crate::catalog::{FilterCriteria, PageWindow, Selection};

// ==================== COMMON STRUCTURES ====================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

// ==================== CATALOG QUERY ====================

/// Query string accepted by the catalog search endpoints. `search` is an
/// alias of `q`, `category` an alias of `field`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub search: Option<String>,
    pub country: Option<String>,
    pub field: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<String>,
}

impl CatalogQuery {
    pub fn criteria(&self) -> FilterCriteria {
        let query = self
            .q
            .as_deref()
            .or(self.search.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        FilterCriteria {
            query,
            country: Selection::parse(self.country.as_deref()),
            field: Selection::parse(self.field.as_deref().or(self.category.as_deref())),
            level: Selection::parse(self.level.as_deref()),
        }
    }

    /// Requested window. `per_page` is bounded to the configured range; the
    /// page itself is clamped by the handler once the match count is known.
    pub fn window(&self, default_page_size: usize) -> PageWindow {
        let page_size = self
            .per_page
            .unwrap_or(default_page_size)
            .clamp(crate::config::MIN_PAGE_SIZE, crate::config::MAX_PAGE_SIZE);
        PageWindow::new(self.page.unwrap_or(1).max(1), page_size)
    }
}
