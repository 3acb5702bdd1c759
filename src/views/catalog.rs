// src/views/catalog.rs
//! Catalog screen state: the fetched list, the selected criteria and the
//! page window. Changing a criterion sends the user back to page 1; the
//! current page is kept inside `[1, total_pages]` at all times.

use crate::catalog::{
    collect_facets, count_matches, filter_catalog, total_pages, CatalogItem, Facets,
    FilterCriteria, FilterResult, PageWindow, Selection,
};
use crate::optimistic::Notifications;

use super::CatalogSource;

#[derive(Debug)]
pub struct CatalogView<T> {
    items: Vec<T>,
    facets: Facets,
    criteria: FilterCriteria,
    window: PageWindow,
    loading: bool,
    pub notifications: Notifications,
}

impl<T: CatalogItem> CatalogView<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            facets: Facets::default(),
            criteria: FilterCriteria::default(),
            window: PageWindow::first(page_size),
            loading: false,
            notifications: Notifications::new(),
        }
    }

    /// Fetches the full catalog. On failure the current list is kept and a
    /// notice is queued.
    pub async fn load<S>(&mut self, source: &S) -> bool
    where
        S: CatalogSource<T> + ?Sized,
    {
        self.loading = true;
        let fetched = source.fetch_all().await;
        self.loading = false;

        match fetched {
            Ok(items) => {
                self.set_items(items);
                true
            }
            Err(e) => {
                log::warn!("Catalog fetch failed: {}", e);
                self.notifications.error(e.to_string());
                false
            }
        }
    }

    /// Replaces the list, in the order given. Facets are rebuilt from the new
    /// list and the page is re-clamped.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.facets = collect_facets(&self.items);
        self.clamp_page();
    }

    /// Reorders the list in place (caller-side sort). Facet order follows
    /// the new list.
    pub fn sort_items(&mut self, sort: impl FnOnce(&mut [T])) {
        sort(&mut self.items);
        self.facets = collect_facets(&self.items);
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn page(&self) -> usize {
        self.window.page
    }

    pub fn page_size(&self) -> usize {
        self.window.page_size
    }

    pub fn total_pages(&self) -> usize {
        total_pages(count_matches(&self.items, &self.criteria), self.window.page_size)
    }

    pub fn result(&self) -> FilterResult<&T> {
        filter_catalog(&self.items, &self.criteria, self.window)
    }

    // ---------- criteria ----------

    pub fn set_query(&mut self, query: &str) {
        let query = query.trim().to_string();
        if self.criteria.query != query {
            self.criteria.query = query;
            self.window.reset();
        }
    }

    pub fn select_country(&mut self, selection: Selection) {
        if self.criteria.country != selection {
            self.criteria.country = selection;
            self.window.reset();
        }
    }

    pub fn select_field(&mut self, selection: Selection) {
        if self.criteria.field != selection {
            self.criteria.field = selection;
            self.window.reset();
        }
    }

    pub fn select_level(&mut self, selection: Selection) {
        if self.criteria.level != selection {
            self.criteria.level = selection;
            self.window.reset();
        }
    }

    pub fn clear_filters(&mut self) {
        if !self.criteria.is_unconstrained() {
            self.criteria = FilterCriteria::default();
            self.window.reset();
        }
    }

    // ---------- paging ----------

    pub fn go_to_page(&mut self, page: usize) {
        self.window.page = page;
        self.clamp_page();
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.window.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.window.page.saturating_sub(1));
    }

    fn clamp_page(&mut self) {
        self.window = self.window.clamped(self.total_pages());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::{ClientError, ClientResult};
    use crate::models::{DegreeLevel, Scholarship};
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    pub(crate) fn scholarship(id: usize, country: &str, level: DegreeLevel, fields: &[&str]) -> Scholarship {
        let now = Utc::now();
        Scholarship {
            id: id.to_string(),
            title: format!("Scholarship {}", id),
            institution: "University".into(),
            country: country.into(),
            level,
            deadline: NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            description: String::new(),
            benefits: Vec::new(),
            requirements: Vec::new(),
            application_url: "https://example.org/apply".into(),
            source_url: None,
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(n: usize) -> Vec<Scholarship> {
        (0..n)
            .map(|i| {
                let country = if i % 2 == 0 { "Japan" } else { "Germany" };
                let level = if i % 3 == 0 { DegreeLevel::PhD } else { DegreeLevel::Masters };
                scholarship(i, country, level, &["Engineering"])
            })
            .collect()
    }

    struct FailingSource;

    #[async_trait]
    impl CatalogSource<Scholarship> for FailingSource {
        async fn fetch_all(&self) -> ClientResult<Vec<Scholarship>> {
            Err(ClientError::Status { status: 503, message: "offline".into() })
        }
    }

    struct FixedSource(Vec<Scholarship>);

    #[async_trait]
    impl CatalogSource<Scholarship> for FixedSource {
        async fn fetch_all(&self) -> ClientResult<Vec<Scholarship>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_criterion_change_resets_page() {
        let mut view = CatalogView::new(10);
        view.set_items(catalog(40));
        view.go_to_page(3);
        assert_eq!(view.page(), 3);

        view.select_country(Selection::only("Japan"));
        assert_eq!(view.page(), 1);
        assert_eq!(view.result().total_count, 20);

        view.go_to_page(2);
        view.select_country(Selection::only("Japan"));
        assert_eq!(view.page(), 2, "same selection is not a change");

        view.set_query("scholarship 1");
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_go_to_page_is_clamped() {
        let mut view = CatalogView::new(16);
        view.set_items(catalog(40));
        view.go_to_page(99);
        assert_eq!(view.page(), 3);
        assert_eq!(view.result().items.len(), 8);
        view.go_to_page(0);
        assert_eq!(view.page(), 1);
        view.prev_page();
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_shrinking_list_reclamps_page() {
        let mut view = CatalogView::new(10);
        view.set_items(catalog(40));
        view.go_to_page(4);
        view.set_items(catalog(5));
        assert_eq!(view.page(), 1);
        assert_eq!(view.facets().levels, vec!["PhD".to_string(), "Masters".to_string()]);
    }

    #[test]
    fn test_sort_rebuilds_facet_order() {
        let mut view = CatalogView::new(10);
        view.set_items(catalog(4));
        assert_eq!(view.facets().countries, vec!["Japan".to_string(), "Germany".to_string()]);

        view.sort_items(|items| items.reverse());
        assert_eq!(view.facets(), &collect_facets(view.items()));
        assert_eq!(view.facets().countries, vec!["Germany".to_string(), "Japan".to_string()]);
    }

    #[test]
    fn test_page_always_valid_under_random_actions() {
        let mut rng = StdRng::seed_from_u64(0x5C401A);
        let mut view = CatalogView::new(10);
        view.set_items(catalog(57));

        for _ in 0..500 {
            let before = view.criteria().clone();
            match rng.gen_range(0..6) {
                0 => view.go_to_page(rng.gen_range(0..12)),
                1 => view.next_page(),
                2 => view.select_country(if rng.gen_bool(0.5) { Selection::All } else { Selection::only("Germany") }),
                3 => view.select_level(if rng.gen_bool(0.5) { Selection::All } else { Selection::only("PhD") }),
                4 => view.set_query(if rng.gen_bool(0.5) { "" } else { "scholarship 2" }),
                _ => view.clear_filters(),
            }
            if &before != view.criteria() {
                assert_eq!(view.page(), 1);
            }
            assert!(view.page() >= 1 && view.page() <= view.total_pages());
        }
    }

    #[actix_rt::test]
    async fn test_failed_load_keeps_list_and_notifies() {
        let mut view = CatalogView::new(16);
        assert!(view.load(&FixedSource(catalog(3))).await);
        assert_eq!(view.items().len(), 3);

        assert!(!view.load(&FailingSource).await);
        assert_eq!(view.items().len(), 3);
        assert!(!view.is_loading());
        assert!(view.notifications.latest().unwrap().message.contains("offline"));
    }
}
