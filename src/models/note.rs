// src/models/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreateNoteRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 20000, message = "Content cannot exceed 20000 characters"))]
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default)]
pub struct UpdateNoteRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 20000, message = "Content cannot exceed 20000 characters"))]
    pub content: Option<String>,
}
