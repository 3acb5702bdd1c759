// src/models/community.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ==================== POSTS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "Content must be between 1 and 10000 characters"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone, Default)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000, message = "Content must be between 1 and 10000 characters"))]
    pub content: Option<String>,
}

// ==================== COMMENTS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub author_name: String,
    pub content: String,
    pub likes_count: i64,
    #[serde(default)]
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Comment must be between 1 and 2000 characters"))]
    pub content: String,
}

// ==================== LIKES ====================

/// State after a like toggle, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}

/// Something a user can like; used by the optimistic toggle on the client.
pub trait Likeable {
    fn liked_by_me(&self) -> bool;
    fn likes_count(&self) -> i64;
    fn set_like(&mut self, liked: bool, likes_count: i64);

    /// Flips the local like flag and adjusts the counter.
    fn toggle_like_locally(&mut self) {
        let liked = !self.liked_by_me();
        let count = if liked { self.likes_count() + 1 } else { (self.likes_count() - 1).max(0) };
        self.set_like(liked, count);
    }
}

impl Likeable for Post {
    fn liked_by_me(&self) -> bool {
        self.liked_by_me
    }
    fn likes_count(&self) -> i64 {
        self.likes_count
    }
    fn set_like(&mut self, liked: bool, likes_count: i64) {
        self.liked_by_me = liked;
        self.likes_count = likes_count;
    }
}

impl Likeable for Comment {
    fn liked_by_me(&self) -> bool {
        self.liked_by_me
    }
    fn likes_count(&self) -> i64 {
        self.likes_count
    }
    fn set_like(&mut self, liked: bool, likes_count: i64) {
        self.liked_by_me = liked;
        self.likes_count = likes_count;
    }
}
