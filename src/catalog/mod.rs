// src/catalog/mod.rs
//! In-memory catalog filter engine.
//!
//! Takes the full list of catalog items (scholarships or guides), a set of
//! filter criteria and a page window, and produces the visible page together
//! with the facet options for every filter dropdown. Nothing here performs
//! I/O; the caller fetches the items and, if it wants a particular order,
//! sorts them before filtering (see [`sort`]).

pub mod facets;
pub mod page;
pub mod sort;

#[cfg(test)]
mod properties;

use serde::{Deserialize, Serialize};

pub use facets::{collect_facets, Facets};
pub use page::{total_pages, PageWindow};

// ==================== ITEM ABSTRACTION ====================

/// The attributes the engine needs from a catalog row.
pub trait CatalogItem {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn description(&self) -> &str;

    /// Extra text searched by the free-text query (institution for scholarships).
    fn secondary_text(&self) -> Option<&str> {
        None
    }

    fn country(&self) -> &str;

    /// Values of the field/category facet. Scholarships expose their fields of
    /// study, guides a single category.
    fn field_values(&self) -> &[String];

    /// `None` for item kinds without a level attribute.
    fn level(&self) -> Option<&str> {
        None
    }

    fn matches_field(&self, field: &str) -> bool {
        self.field_values().iter().any(|f| f == field)
    }
}

// ==================== SELECTION ====================

/// A dropdown selection. `All` is the sentinel for "no constraint"; an unset
/// selection deserialises to `All` as well.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

pub const ALL_SENTINEL: &str = "all";

impl Selection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Selection::All,
            Some(v) if v.is_empty() || v.eq_ignore_ascii_case(ALL_SENTINEL) => Selection::All,
            Some(v) => Selection::Only(v.to_string()),
        }
    }

    pub fn only(value: impl Into<String>) -> Self {
        Selection::parse(Some(&value.into()))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }

    fn accepts(&self, candidate: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(v) => v == candidate,
        }
    }
}

impl From<Option<String>> for Selection {
    fn from(raw: Option<String>) -> Self {
        Selection::parse(raw.as_deref())
    }
}

impl From<Selection> for String {
    fn from(s: Selection) -> Self {
        match s {
            Selection::All => ALL_SENTINEL.to_string(),
            Selection::Only(v) => v,
        }
    }
}

// ==================== CRITERIA ====================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub query: String,
    pub country: Selection,
    pub field: Selection,
    pub level: Selection,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Selection::only(country);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Selection::only(field);
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Selection::only(level);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.query.is_empty() && self.country.is_all() && self.field.is_all() && self.level.is_all()
    }

    /// AND of the text, country, field and level predicates.
    pub fn matches<T: CatalogItem + ?Sized>(&self, item: &T) -> bool {
        self.matches_text(item)
            && self.country.accepts(item.country())
            && self.matches_field(item)
            && self.matches_level(item)
    }

    fn matches_text<T: CatalogItem + ?Sized>(&self, item: &T) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        let hit = |haystack: &str| haystack.to_lowercase().contains(&needle);

        hit(item.title()) || hit(item.description()) || item.secondary_text().map_or(false, hit)
    }

    fn matches_field<T: CatalogItem + ?Sized>(&self, item: &T) -> bool {
        match self.field.value() {
            None => true,
            Some(field) => item.matches_field(field),
        }
    }

    // Item kinds without a level attribute ignore the level criterion.
    fn matches_level<T: CatalogItem + ?Sized>(&self, item: &T) -> bool {
        match (self.level.value(), item.level()) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(level)) => wanted == level,
        }
    }
}

// ==================== RESULT ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult<T> {
    pub items: Vec<T>,
    pub facets: Facets,
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T: Clone> FilterResult<&T> {
    pub fn into_owned(self) -> FilterResult<T> {
        FilterResult {
            items: self.items.into_iter().cloned().collect(),
            facets: self.facets,
            total_count: self.total_count,
            total_pages: self.total_pages,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

// ==================== ENGINE ====================

/// Items matching `criteria`, in source order.
pub fn matching<'a, T: CatalogItem>(items: &'a [T], criteria: &FilterCriteria) -> Vec<&'a T> {
    items.iter().filter(|item| criteria.matches(*item)).collect()
}

pub fn count_matches<T: CatalogItem>(items: &[T], criteria: &FilterCriteria) -> usize {
    items.iter().filter(|item| criteria.matches(*item)).count()
}

/// Filters, paginates and collects facets.
///
/// The page in `window` is used as given: a page past the end (or page 0)
/// yields an empty `items` list. Callers that need a valid page clamp with
/// [`PageWindow::clamped`] first.
pub fn filter_catalog<'a, T: CatalogItem>(
    items: &'a [T],
    criteria: &FilterCriteria,
    window: PageWindow,
) -> FilterResult<&'a T> {
    let filtered = matching(items, criteria);
    let total_count = filtered.len();
    let visible = window.slice(&filtered).to_vec();

    FilterResult {
        items: visible,
        facets: collect_facets(items),
        total_count,
        total_pages: total_pages(total_count, window.page_size),
        page: window.page,
        page_size: window.page_size,
    }
}
