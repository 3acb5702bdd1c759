// src/views/mod.rs
//! UI-binding state. Each view owns the state one screen renders and talks
//! to the API through a small backend trait, so it can be driven by
//! [`ApiClient`] or by an in-memory fake.

pub mod catalog;
pub mod comments;
pub mod feed;
pub mod saved;

pub use catalog::CatalogView;
pub use comments::CommentThread;
pub use feed::PostFeed;
pub use saved::SavedScholarships;

use async_trait::async_trait;

use crate::catalog::sort::PostSort;
use crate::client::{ApiClient, ClientResult};
use crate::models::{Comment, CreateCommentRequest, Guide, LikeState, Post, SaveState, Scholarship};

/// Full-table fetch of one catalog.
#[async_trait]
pub trait CatalogSource<T>: Send + Sync {
    async fn fetch_all(&self) -> ClientResult<Vec<T>>;
}

#[async_trait]
pub trait CommunityBackend: Send + Sync {
    async fn fetch_posts(&self, sort: PostSort) -> ClientResult<Vec<Post>>;
    async fn fetch_post(&self, id: &str) -> ClientResult<Post>;
    async fn toggle_like(&self, post_id: &str) -> ClientResult<LikeState>;
}

#[async_trait]
pub trait CommentBackend: Send + Sync {
    async fn fetch_comments(&self, post_id: &str) -> ClientResult<Vec<Comment>>;
    async fn toggle_comment_like(&self, comment_id: &str) -> ClientResult<LikeState>;
    async fn create_comment(&self, post_id: &str, request: &CreateCommentRequest) -> ClientResult<Comment>;
}

#[async_trait]
pub trait SavedBackend: Send + Sync {
    async fn fetch_saved(&self) -> ClientResult<Vec<Scholarship>>;
    async fn set_saved(&self, scholarship_id: &str, saved: bool) -> ClientResult<SaveState>;
}

#[async_trait]
impl CatalogSource<Scholarship> for ApiClient {
    async fn fetch_all(&self) -> ClientResult<Vec<Scholarship>> {
        self.scholarships().await
    }
}

#[async_trait]
impl CatalogSource<Guide> for ApiClient {
    async fn fetch_all(&self) -> ClientResult<Vec<Guide>> {
        self.guides().await
    }
}

#[async_trait]
impl CommunityBackend for ApiClient {
    async fn fetch_posts(&self, sort: PostSort) -> ClientResult<Vec<Post>> {
        self.posts(sort).await
    }

    async fn fetch_post(&self, id: &str) -> ClientResult<Post> {
        self.post(id).await
    }

    async fn toggle_like(&self, post_id: &str) -> ClientResult<LikeState> {
        self.toggle_post_like(post_id).await
    }
}

#[async_trait]
impl CommentBackend for ApiClient {
    async fn fetch_comments(&self, post_id: &str) -> ClientResult<Vec<Comment>> {
        self.comments(post_id).await
    }

    async fn toggle_comment_like(&self, comment_id: &str) -> ClientResult<LikeState> {
        ApiClient::toggle_comment_like(self, comment_id).await
    }

    async fn create_comment(&self, post_id: &str, request: &CreateCommentRequest) -> ClientResult<Comment> {
        ApiClient::create_comment(self, post_id, request).await
    }
}

#[async_trait]
impl SavedBackend for ApiClient {
    async fn fetch_saved(&self) -> ClientResult<Vec<Scholarship>> {
        self.saved_scholarships().await
    }

    async fn set_saved(&self, scholarship_id: &str, saved: bool) -> ClientResult<SaveState> {
        if saved {
            self.save_scholarship(scholarship_id).await
        } else {
            self.unsave_scholarship(scholarship_id).await
        }
    }
}
