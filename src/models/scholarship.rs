// src/models/scholarship.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{coerce_string_list, lenient_string_list, nullable, DegreeLevel};
use crate::catalog::CatalogItem;

// ==================== SCHOLARSHIP ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scholarship {
    pub id: String,
    pub title: String,
    pub institution: String,
    pub country: String,
    pub level: DegreeLevel,
    pub deadline: NaiveDate,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub fields: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub benefits: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub requirements: Vec<String>,
    pub application_url: String,
    pub source_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `scholarships` row; array columns are JSON text.
#[derive(Debug, sqlx::FromRow)]
pub struct ScholarshipRow {
    pub id: String,
    pub title: String,
    pub institution: String,
    pub country: String,
    pub level: String,
    pub deadline: NaiveDate,
    pub fields: Option<String>,
    pub description: Option<String>,
    pub benefits: Option<String>,
    pub requirements: Option<String>,
    pub application_url: String,
    pub source_url: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ScholarshipRow> for Scholarship {
    type Error = String;

    fn try_from(row: ScholarshipRow) -> Result<Self, Self::Error> {
        let level = DegreeLevel::from_str(&row.level)
            .ok_or_else(|| format!("scholarship '{}' has unknown level '{}'", row.id, row.level))?;

        Ok(Self {
            fields: coerce_string_list(row.fields.as_deref()),
            benefits: coerce_string_list(row.benefits.as_deref()),
            requirements: coerce_string_list(row.requirements.as_deref()),
            id: row.id,
            title: row.title,
            institution: row.institution,
            country: row.country,
            level,
            deadline: row.deadline,
            description: row.description.unwrap_or_default(),
            application_url: row.application_url,
            source_url: row.source_url,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl CatalogItem for Scholarship {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn secondary_text(&self) -> Option<&str> {
        Some(&self.institution)
    }

    fn country(&self) -> &str {
        &self.country
    }

    fn field_values(&self) -> &[String] {
        &self.fields
    }

    fn level(&self) -> Option<&str> {
        Some(self.level.as_str())
    }
}

// ==================== REQUESTS ====================

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreateScholarshipRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 255, message = "Institution must be between 1 and 255 characters"))]
    pub institution: String,

    #[validate(length(min = 1, max = 100, message = "Country must be between 1 and 100 characters"))]
    pub country: String,

    pub level: String,

    pub deadline: NaiveDate,

    #[serde(default, deserialize_with = "lenient_string_list")]
    pub fields: Vec<String>,

    #[validate(length(max = 10000, message = "Description cannot exceed 10000 characters"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_string_list")]
    pub benefits: Vec<String>,

    #[serde(default, deserialize_with = "lenient_string_list")]
    pub requirements: Vec<String>,

    #[validate(url(message = "Application URL must be a valid URL"))]
    pub application_url: String,

    #[validate(url(message = "Source URL must be a valid URL"))]
    pub source_url: Option<String>,

    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default)]
pub struct UpdateScholarshipRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Institution must be between 1 and 255 characters"))]
    pub institution: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Country must be between 1 and 100 characters"))]
    pub country: Option<String>,

    pub level: Option<String>,

    pub deadline: Option<NaiveDate>,

    pub fields: Option<Vec<String>>,

    #[validate(length(max = 10000, message = "Description cannot exceed 10000 characters"))]
    pub description: Option<String>,

    pub benefits: Option<Vec<String>>,

    pub requirements: Option<Vec<String>>,

    #[validate(url(message = "Application URL must be a valid URL"))]
    pub application_url: Option<String>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Source URL must be a valid URL"))]
    pub source_url: Option<Option<String>>,

    pub featured: Option<bool>,
}

/// Returned by save/unsave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub saved: bool,
}

/// Trims entries and drops blanks and duplicates, keeping order.
pub fn normalize_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let v = v.trim();
        if !v.is_empty() && !out.iter().any(|existing| existing == v) {
            out.push(v.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(level: &str, fields: Option<&str>) -> ScholarshipRow {
        let now = Utc::now();
        ScholarshipRow {
            id: "s1".into(),
            title: "JICA".into(),
            institution: "JICA".into(),
            country: "Japan".into(),
            level: level.into(),
            deadline: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            fields: fields.map(str::to_string),
            description: None,
            benefits: Some("\"tuition\"".into()),
            requirements: None,
            application_url: "https://example.org/apply".into(),
            source_url: None,
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_row_coerces_malformed_arrays() {
        let s = Scholarship::try_from(row("Masters", Some("{\"x\":1}"))).unwrap();
        assert!(s.fields.is_empty());
        assert!(s.benefits.is_empty());
        assert!(s.requirements.is_empty());
        assert_eq!(s.description, "");
    }

    #[test]
    fn test_row_with_unknown_level_is_rejected() {
        assert!(Scholarship::try_from(row("Diploma", None)).is_err());
    }

    #[test]
    fn test_deserialize_tolerates_non_array_fields() {
        let json = r#"{
            "id": "s1", "title": "T", "institution": "I", "country": "Japan",
            "level": "PhD", "deadline": "2026-05-01", "fields": "Engineering",
            "application_url": "https://example.org", "source_url": null,
            "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let s: Scholarship = serde_json::from_str(json).unwrap();
        assert!(s.fields.is_empty());
        assert!(!s.featured);
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateScholarshipRequest {
            title: "".into(),
            institution: "MEXT".into(),
            country: "Japan".into(),
            level: "PhD".into(),
            deadline: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            fields: vec![],
            description: None,
            benefits: vec![],
            requirements: vec![],
            application_url: "not a url".into(),
            source_url: None,
            featured: false,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("application_url"));
    }

    #[test]
    fn test_normalize_list() {
        let input = vec![" Law ".to_string(), "".into(), "Law".into(), "Art".into()];
        assert_eq!(normalize_list(&input), vec!["Law", "Art"]);
    }

}
