// src/models/chat.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

super::define_label_enum! {
    pub enum ChatRole {
        User => "user",
        Assistant => "assistant",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub scholarship_id: Option<String>,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ChatMessageRow {
    pub id: String,
    pub user_id: String,
    pub scholarship_id: Option<String>,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            scholarship_id: row.scholarship_id,
            role: ChatRole::from_str(&row.role).unwrap_or(ChatRole::Assistant),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be between 1 and 4000 characters"))]
    pub message: String,
    pub scholarship_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_labels() {
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(serde_json::to_string(&ChatRole::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(ChatRole::from_str("USER"), Some(ChatRole::User));
    }
}
