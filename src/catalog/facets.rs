// src/catalog/facets.rs
//! Distinct dropdown options, always taken from the full unfiltered list so
//! that narrowing one filter never hides options of another.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::CatalogItem;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub countries: Vec<String>,
    /// Fields of study for scholarships, categories for guides.
    pub fields: Vec<String>,
    pub levels: Vec<String>,
}

/// Keeps the first occurrence of every non-blank value.
#[derive(Default)]
struct Distinct {
    seen: HashSet<String>,
    values: Vec<String>,
}

impl Distinct {
    fn push(&mut self, value: &str) {
        if value.trim().is_empty() {
            return;
        }
        if self.seen.insert(value.to_string()) {
            self.values.push(value.to_string());
        }
    }
}

pub fn collect_facets<T: CatalogItem>(items: &[T]) -> Facets {
    let mut countries = Distinct::default();
    let mut fields = Distinct::default();
    let mut levels = Distinct::default();

    for item in items {
        countries.push(item.country());
        for field in item.field_values() {
            fields.push(field);
        }
        if let Some(level) = item.level() {
            levels.push(level);
        }
    }

    Facets {
        countries: countries.values,
        fields: fields.values,
        levels: levels.values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::Item;

    fn item(country: &str, level: &str, fields: &[&str]) -> Item {
        Item {
            id: String::new(),
            title: String::new(),
            institution: String::new(),
            description: String::new(),
            country: country.to_string(),
            level: level.to_string(),
            fields: fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_first_seen_order_without_duplicates() {
        let items = vec![
            item("Japan", "PhD", &["Physics", "Law"]),
            item("Germany", "Masters", &["Law"]),
            item("Japan", "PhD", &["Art"]),
        ];
        let facets = collect_facets(&items);
        assert_eq!(facets.countries, vec!["Japan", "Germany"]);
        assert_eq!(facets.fields, vec!["Physics", "Law", "Art"]);
        assert_eq!(facets.levels, vec!["PhD", "Masters"]);
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let items = vec![item("", "PhD", &["", "  ", "Law"])];
        let facets = collect_facets(&items);
        assert!(facets.countries.is_empty());
        assert_eq!(facets.fields, vec!["Law"]);
    }
}
