// src/models/translation.rs
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    // "en", "fr", "pt-BR"
    pub static ref LOCALE_REGEX: Regex = Regex::new(r"^[a-z]{2,3}(-[A-Za-z]{2,4})?$").unwrap();
    // "nav.home", "scholarship.apply_button"
    pub static ref KEY_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,150}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Translation {
    pub key: String,
    pub locale: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct UpsertTranslationRequest {
    #[validate(length(min = 1, max = 5000, message = "Value must be between 1 and 5000 characters"))]
    pub value: String,
}

pub fn is_valid_locale(locale: &str) -> bool {
    LOCALE_REGEX.is_match(locale)
}

pub fn is_valid_key(key: &str) -> bool {
    KEY_REGEX.is_match(key)
}
