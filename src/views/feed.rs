// src/views/feed.rs
use std::cell::Cell;

use crate::catalog::sort::PostSort;
use crate::client::ClientError;
use crate::models::{LikeState, Likeable, Post};
use crate::optimistic::{self, Notifications, OptimisticOutcome};

use super::CommunityBackend;

/// Community feed with optimistic like toggles.
#[derive(Debug, Default)]
pub struct PostFeed {
    posts: Vec<Post>,
    sort: PostSort,
    pub notifications: Notifications,
}

impl PostFeed {
    pub fn new(sort: PostSort) -> Self {
        Self { sort, ..Self::default() }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn sort(&self) -> PostSort {
        self.sort
    }

    pub async fn load<B: CommunityBackend + ?Sized>(&mut self, backend: &B) -> bool {
        match backend.fetch_posts(self.sort).await {
            Ok(posts) => {
                self.posts = posts;
                true
            }
            Err(e) => {
                self.notifications.error(e.to_string());
                false
            }
        }
    }

    pub async fn set_sort<B: CommunityBackend + ?Sized>(&mut self, backend: &B, sort: PostSort) -> bool {
        if self.sort == sort {
            return true;
        }
        self.sort = sort;
        self.load(backend).await
    }

    /// Flips the like locally, then writes it. A confirmed write adopts the
    /// stored count; a failed one re-fetches the post. `None` when the post
    /// is not in the feed.
    pub async fn toggle_like<B: CommunityBackend + ?Sized>(
        &mut self,
        backend: &B,
        post_id: &str,
    ) -> Option<OptimisticOutcome> {
        let post = self.posts.iter_mut().find(|p| p.id == post_id)?;

        let stored: Cell<Option<LikeState>> = Cell::new(None);
        let stored_ref = &stored;
        let outcome = optimistic::apply(
            post,
            |p: &mut Post| p.toggle_like_locally(),
            move || async move {
                stored_ref.set(Some(backend.toggle_like(post_id).await?));
                Ok::<(), ClientError>(())
            },
            move || async move { backend.fetch_post(post_id).await },
        )
        .await;

        if let (OptimisticOutcome::Confirmed, Some(state)) = (&outcome, stored.get()) {
            if let Some(post) = self.posts.iter_mut().find(|p| p.id == post_id) {
                post.set_like(state.liked, state.likes_count);
            }
        }

        self.notifications.record(&outcome);
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientResult;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

    fn post(id: &str, likes: i64) -> Post {
        let now = Utc::now();
        Post {
            id: id.into(),
            user_id: "u1".into(),
            author_name: "amina".into(),
            title: format!("Post {}", id),
            content: "Tips".into(),
            likes_count: likes,
            comments_count: 0,
            liked_by_me: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stores a single post; counts likes the way the server does.
    struct FakeCommunity {
        likes: AtomicI64,
        liked: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl FakeCommunity {
        fn new(likes: i64) -> Self {
            Self { likes: AtomicI64::new(likes), liked: AtomicBool::new(false), fail_writes: AtomicBool::new(false) }
        }

        fn stored(&self) -> Post {
            let mut p = post("p1", self.likes.load(Ordering::SeqCst));
            p.liked_by_me = self.liked.load(Ordering::SeqCst);
            p
        }
    }

    #[async_trait]
    impl CommunityBackend for FakeCommunity {
        async fn fetch_posts(&self, _sort: PostSort) -> ClientResult<Vec<Post>> {
            Ok(vec![self.stored()])
        }

        async fn fetch_post(&self, _id: &str) -> ClientResult<Post> {
            Ok(self.stored())
        }

        async fn toggle_like(&self, _post_id: &str) -> ClientResult<LikeState> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ClientError::Status { status: 500, message: "write failed".into() });
            }
            let liked = !self.liked.fetch_xor(true, Ordering::SeqCst);
            let delta = if liked { 1 } else { -1 };
            // another user liked it meanwhile
            let likes = self.likes.fetch_add(delta + 1, Ordering::SeqCst) + delta + 1;
            Ok(LikeState { liked, likes_count: likes })
        }
    }

    #[actix_rt::test]
    async fn test_confirmed_like_adopts_stored_count() {
        let backend = FakeCommunity::new(4);
        let mut feed = PostFeed::new(PostSort::MostRecent);
        assert!(feed.load(&backend).await);

        let outcome = feed.toggle_like(&backend, "p1").await.unwrap();
        assert!(outcome.is_confirmed());
        assert!(feed.posts()[0].liked_by_me);
        assert_eq!(feed.posts()[0].likes_count, 6);
        assert!(feed.notifications.is_empty());
    }

    #[actix_rt::test]
    async fn test_failed_like_reverts_to_stored_post() {
        let backend = FakeCommunity::new(4);
        backend.fail_writes.store(true, Ordering::SeqCst);
        let mut feed = PostFeed::new(PostSort::MostRecent);
        feed.load(&backend).await;

        let outcome = feed.toggle_like(&backend, "p1").await.unwrap();
        assert_eq!(outcome, OptimisticOutcome::Reverted {
            notice: "Request failed with status 500: write failed".into(),
        });
        assert!(!feed.posts()[0].liked_by_me);
        assert_eq!(feed.posts()[0].likes_count, 4);
        assert_eq!(feed.notifications.len(), 1);
    }

    #[actix_rt::test]
    async fn test_unknown_post_is_ignored() {
        let backend = FakeCommunity::new(0);
        let mut feed = PostFeed::new(PostSort::MostLiked);
        feed.load(&backend).await;
        assert!(feed.toggle_like(&backend, "missing").await.is_none());
    }
}
