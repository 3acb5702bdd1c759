// src/views/comments.rs
use std::cell::Cell;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::UserInfo;
use crate::client::{ClientError, ClientResult};
use crate::models::{Comment, CreateCommentRequest, LikeState, Likeable};
use crate::optimistic::{self, Notifications, OptimisticOutcome};

use super::CommentBackend;

const PENDING_PREFIX: &str = "pending-";

/// Comments under one post, oldest first.
#[derive(Debug)]
pub struct CommentThread {
    post_id: String,
    comments: Vec<Comment>,
    pub notifications: Notifications,
}

impl CommentThread {
    pub fn new(post_id: impl Into<String>) -> Self {
        Self { post_id: post_id.into(), comments: Vec::new(), notifications: Notifications::new() }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// True while a comment is shown but not yet stored.
    pub fn has_pending(&self) -> bool {
        self.comments.iter().any(|c| c.id.starts_with(PENDING_PREFIX))
    }

    pub async fn load<B: CommentBackend + ?Sized>(&mut self, backend: &B) -> bool {
        match backend.fetch_comments(&self.post_id).await {
            Ok(comments) => {
                self.comments = comments;
                true
            }
            Err(e) => {
                self.notifications.error(e.to_string());
                false
            }
        }
    }

    /// Flips the like on one comment. A confirmed write adopts the stored
    /// count; a failed one re-fetches the thread. `None` when the comment is
    /// not in the thread.
    pub async fn toggle_like<B: CommentBackend + ?Sized>(
        &mut self,
        backend: &B,
        comment_id: &str,
    ) -> Option<OptimisticOutcome> {
        if !self.comments.iter().any(|c| c.id == comment_id) {
            return None;
        }

        let post_id = self.post_id.as_str();
        let stored: Cell<Option<LikeState>> = Cell::new(None);
        let stored_ref = &stored;
        let outcome = optimistic::apply(
            &mut self.comments,
            |comments: &mut Vec<Comment>| {
                if let Some(c) = comments.iter_mut().find(|c| c.id == comment_id) {
                    c.toggle_like_locally();
                }
            },
            move || async move {
                stored_ref.set(Some(backend.toggle_comment_like(comment_id).await?));
                Ok::<(), ClientError>(())
            },
            move || async move { backend.fetch_comments(post_id).await },
        )
        .await;

        if let (OptimisticOutcome::Confirmed, Some(state)) = (&outcome, stored.get()) {
            if let Some(c) = self.comments.iter_mut().find(|c| c.id == comment_id) {
                c.set_like(state.liked, state.likes_count);
            }
        }

        self.notifications.record(&outcome);
        Some(outcome)
    }

    /// Shows the comment at once under `author`, then stores it. The stored
    /// comment replaces the placeholder; on failure the placeholder is gone
    /// after the revert. Invalid content is rejected before anything changes.
    pub async fn add_comment<B: CommentBackend + ?Sized>(
        &mut self,
        backend: &B,
        author: &UserInfo,
        content: &str,
    ) -> ClientResult<OptimisticOutcome> {
        let request = CreateCommentRequest { content: content.trim().to_string() };
        request.validate()?;

        let placeholder = Comment {
            id: format!("{}{}", PENDING_PREFIX, Uuid::new_v4()),
            post_id: self.post_id.clone(),
            user_id: author.id.clone(),
            author_name: author.full_name.clone().unwrap_or_else(|| author.username.clone()),
            content: request.content.clone(),
            likes_count: 0,
            liked_by_me: false,
            created_at: Utc::now(),
        };
        let placeholder_id = placeholder.id.clone();

        let post_id = self.post_id.as_str();
        let request_ref = &request;
        let stored: Cell<Option<Comment>> = Cell::new(None);
        let stored_ref = &stored;
        let outcome = optimistic::apply(
            &mut self.comments,
            |comments: &mut Vec<Comment>| comments.push(placeholder),
            move || async move {
                stored_ref.set(Some(backend.create_comment(post_id, request_ref).await?));
                Ok::<(), ClientError>(())
            },
            move || async move { backend.fetch_comments(post_id).await },
        )
        .await;

        if let (OptimisticOutcome::Confirmed, Some(comment)) = (&outcome, stored.take()) {
            match self.comments.iter_mut().find(|c| c.id == placeholder_id) {
                Some(slot) => *slot = comment,
                None => self.comments.push(comment),
            }
        }

        self.notifications.record(&outcome);
        Ok(outcome)
    }
}
