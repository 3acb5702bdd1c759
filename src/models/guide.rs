// src/models/guide.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::slice;
use validator::Validate;

use super::{coerce_steps, lenient_steps, nullable};
use crate::catalog::CatalogItem;

/// Categories offered to editors; free text is still accepted.
pub const SUGGESTED_GUIDE_CATEGORIES: &[&str] = &[
    "Application Tips",
    "Visa & Immigration",
    "Test Preparation",
    "Essay Writing",
    "Interview Preparation",
    "Living Abroad",
    "Funding & Finance",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GuideStep {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Step title must be between 1 and 255 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 20000, message = "Step content cannot exceed 20000 characters"))]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub country: String,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_steps")]
    pub steps: Vec<GuideStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct GuideRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub country: String,
    pub image_url: Option<String>,
    pub steps: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GuideRow> for Guide {
    fn from(row: GuideRow) -> Self {
        Self {
            steps: coerce_steps(row.steps.as_deref()),
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            category: row.category,
            country: row.country,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CatalogItem for Guide {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn country(&self) -> &str {
        &self.country
    }

    fn field_values(&self) -> &[String] {
        slice::from_ref(&self.category)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreateGuideRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    #[validate(length(max = 10000, message = "Description cannot exceed 10000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Category must be between 1 and 100 characters"))]
    pub category: String,

    #[validate(length(min = 1, max = 100, message = "Country must be between 1 and 100 characters"))]
    pub country: String,

    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,

    #[serde(default, deserialize_with = "lenient_steps")]
    #[validate(nested)]
    pub steps: Vec<GuideStep>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default)]
pub struct UpdateGuideRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Description cannot exceed 10000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Category must be between 1 and 100 characters"))]
    pub category: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Country must be between 1 and 100 characters"))]
    pub country: Option<String>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<Option<String>>,

    #[validate(nested)]
    pub steps: Option<Vec<GuideStep>>,
}
