// src/catalog/properties.rs
//! Randomised checks of the engine's algebraic properties. Every case is drawn
//! from a fixed seed so a failure reproduces exactly.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::tests::Item;
use super::*;

const COUNTRIES: &[&str] = &["Japan", "Germany", "United Kingdom", "Kenya", ""];
const LEVELS: &[&str] = &["Undergraduate", "Masters", "PhD", "Research", "Training"];
const FIELDS: &[&str] = &["Engineering", "Law", "Medicine", "All fields", "Art"];
const WORDS: &[&str] = &["Global", "japan", "Excellence", "Tokyo", "Research", "Award", "Fund"];
const CASES: u64 = 200;

fn random_item(rng: &mut StdRng, id: usize) -> Item {
    let words = |rng: &mut StdRng, n: usize| {
        (0..n)
            .map(|_| *WORDS.choose(rng).unwrap())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let field_count = rng.gen_range(0..=3);
    Item {
        id: id.to_string(),
        title: words(rng, 2),
        institution: words(rng, 1),
        description: words(rng, 3),
        country: COUNTRIES.choose(rng).unwrap().to_string(),
        level: LEVELS.choose(rng).unwrap().to_string(),
        fields: (0..field_count)
            .map(|_| FIELDS.choose(rng).unwrap().to_string())
            .collect(),
    }
}

fn random_items(rng: &mut StdRng) -> Vec<Item> {
    let n = rng.gen_range(0..60);
    (0..n).map(|i| random_item(rng, i)).collect()
}

fn maybe(rng: &mut StdRng, pool: &[&str]) -> Selection {
    if rng.gen_bool(0.5) {
        Selection::All
    } else {
        Selection::only(*pool.choose(rng).unwrap())
    }
}

fn random_criteria(rng: &mut StdRng) -> FilterCriteria {
    FilterCriteria {
        query: if rng.gen_bool(0.5) { String::new() } else { WORDS.choose(rng).unwrap().to_uppercase() },
        country: maybe(rng, COUNTRIES),
        field: maybe(rng, FIELDS),
        level: maybe(rng, LEVELS),
    }
}

/// Splits one set of criteria into two that constrain disjoint attributes.
fn split(rng: &mut StdRng, full: &FilterCriteria) -> (FilterCriteria, FilterCriteria) {
    let mut a = FilterCriteria::new();
    let mut b = FilterCriteria::new();
    if rng.gen_bool(0.5) { a.query = full.query.clone() } else { b.query = full.query.clone() }
    if rng.gen_bool(0.5) { a.country = full.country.clone() } else { b.country = full.country.clone() }
    if rng.gen_bool(0.5) { a.field = full.field.clone() } else { b.field = full.field.clone() }
    if rng.gen_bool(0.5) { a.level = full.level.clone() } else { b.level = full.level.clone() }
    (a, b)
}

fn ids<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<&'a str> {
    items.into_iter().map(|i| i.id.as_str()).collect()
}

#[test]
fn prop_unconstrained_pages_reconstruct_source() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0001);
    for _ in 0..CASES {
        let items = random_items(&mut rng);
        let page_size = rng.gen_range(1..=24);
        let criteria = FilterCriteria::new();

        let first = filter_catalog(&items, &criteria, PageWindow::new(1, page_size));
        let mut joined = Vec::new();
        for page in 1..=first.total_pages {
            joined.extend(filter_catalog(&items, &criteria, PageWindow::new(page, page_size)).items);
        }
        assert_eq!(ids(joined), ids(&items));
    }
}

#[test]
fn prop_and_composes() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0002);
    for _ in 0..CASES {
        let items = random_items(&mut rng);
        let full = random_criteria(&mut rng);
        let (a, b) = split(&mut rng, &full);

        let at_once = matching(&items, &full);
        let narrowed_a: Vec<Item> = matching(&items, &a).into_iter().cloned().collect();
        let stepwise = matching(&narrowed_a, &b);

        assert_eq!(ids(at_once), ids(stepwise), "criteria {:?} split into {:?} / {:?}", full, a, b);
    }
}

#[test]
fn prop_facets_stable_under_narrowing() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0003);
    for _ in 0..CASES {
        let items = random_items(&mut rng);
        let baseline = filter_catalog(&items, &FilterCriteria::new(), PageWindow::first(16)).facets;
        let narrowed = filter_catalog(&items, &random_criteria(&mut rng), PageWindow::first(16)).facets;
        assert_eq!(baseline, narrowed);
    }
}

#[test]
fn prop_pages_cover_filtered_set_exactly_once() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0004);
    for _ in 0..CASES {
        let items = random_items(&mut rng);
        let criteria = random_criteria(&mut rng);
        let page_size = rng.gen_range(1..=30);

        let expected = matching(&items, &criteria);
        let first = filter_catalog(&items, &criteria, PageWindow::new(1, page_size));
        assert_eq!(first.total_count, expected.len());
        assert_eq!(first.total_pages, total_pages(expected.len(), page_size));

        let mut seen = Vec::new();
        for page in 1..=first.total_pages {
            let result = filter_catalog(&items, &criteria, PageWindow::new(page, page_size));
            assert!(result.items.len() <= page_size);
            seen.extend(result.items);
        }
        assert_eq!(ids(seen), ids(expected));

        let past_end = filter_catalog(&items, &criteria, PageWindow::new(first.total_pages + 1, page_size));
        assert!(past_end.items.is_empty());
    }
}
