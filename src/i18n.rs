// src/i18n.rs - In-memory translation table
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::models::Translation;

/// Key/locale lookup. A missing entry resolves to the key itself, so the UI
/// always has something to show.
#[derive(Debug, Default)]
pub struct Translator {
    entries: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K, L, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, L, V)>,
        K: Into<String>,
        L: Into<String>,
        V: Into<String>,
    {
        let translator = Self::new();
        for (key, locale, value) in entries {
            translator.set(key.into(), locale.into(), value.into());
        }
        translator
    }

    /// Replaces the table with the contents of the `translations` table.
    pub async fn load(&self, pool: &SqlitePool) -> Result<usize, sqlx::Error> {
        let rows: Vec<Translation> = sqlx::query_as("SELECT * FROM translations")
            .fetch_all(pool)
            .await?;

        let mut table: HashMap<String, HashMap<String, String>> = HashMap::new();
        let count = rows.len();
        for row in rows {
            table.entry(row.locale).or_default().insert(row.key, row.value);
        }

        *self.entries.write().unwrap_or_else(|e| e.into_inner()) = table;
        Ok(count)
    }

    pub fn lookup(&self, key: &str, locale: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(locale)
            .and_then(|dict| dict.get(key))
            .cloned()
    }

    pub fn get(&self, key: &str, locale: &str) -> String {
        self.lookup(key, locale).unwrap_or_else(|| key.to_string())
    }

    pub fn set(&self, key: String, locale: String, value: String) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(locale)
            .or_default()
            .insert(key, value);
    }

    pub fn remove(&self, key: &str, locale: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(dict) = entries.get_mut(locale) else {
            return false;
        };
        let removed = dict.remove(key).is_some();
        if dict.is_empty() {
            entries.remove(locale);
        }
        removed
    }

    /// Every key of one locale, sorted by key.
    pub fn dictionary(&self, locale: &str) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(locale)
            .map(|dict| dict.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        locales.sort();
        locales
    }
}
