//! In-process backend for all three storage seams.
//!
//! Posts and swipes are kept in insertion order, so the feed enumerates
//! posts oldest first. Every operation takes the lock for its own duration
//! only; guards never escape a method.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{PostStore, SwipeLedger, UserDirectory};
use crate::error::{Error, Result};
use crate::models::{
    NewPost, NewSwipe, Post, PostId, SwipeDirection, SwipeId, SwipeRecord, User, UserId,
};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    posts: Vec<Post>,
    swipes: Vec<SwipeRecord>,
}

/// Shared in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, standing in for the external identity provider.
    pub async fn insert_user(&self, username: impl Into<String>) -> User {
        let user = User {
            id: UserId::new(),
            username: username.into(),
        };
        self.inner
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        debug!("Registered in-memory user {} ({})", user.username, user.id);
        user
    }

    /// Total number of swipe records, duplicates included
    pub async fn swipe_count(&self) -> usize {
        self.inner.read().await.swipes.len()
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn create_post(&self, author: UserId, post: NewPost) -> Result<Post> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&author) {
            return Err(Error::not_found("user", author));
        }

        let post = Post {
            id: PostId::new(),
            author_id: author,
            title: post.title,
            description: post.description,
            stack: post.stack,
            category: post.category,
            image: post.image,
            created_at: Utc::now(),
        };
        inner.posts.push(post.clone());
        Ok(post)
    }

    async fn find_post_by_id(&self, id: PostId) -> Result<Option<Post>> {
        let inner = self.inner.read().await;
        Ok(inner.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_all_posts(&self) -> Result<Vec<Post>> {
        Ok(self.inner.read().await.posts.clone())
    }

    async fn list_posts_by_author(&self, author: UserId) -> Result<Vec<Post>> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .iter()
            .filter(|p| p.author_id == author)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SwipeLedger for InMemoryStore {
    async fn append_swipe(&self, swipe: NewSwipe) -> Result<SwipeRecord> {
        let record = SwipeRecord {
            id: SwipeId::new(),
            user_id: swipe.user_id,
            post_id: swipe.post_id,
            direction: swipe.direction,
            swiped_at: swipe.swiped_at,
        };
        self.inner.write().await.swipes.push(record.clone());
        Ok(record)
    }

    async fn list_swipes_by_user(
        &self,
        user: UserId,
        direction: Option<SwipeDirection>,
    ) -> Result<Vec<SwipeRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .swipes
            .iter()
            .filter(|s| s.user_id == user)
            .filter(|s| direction.map_or(true, |d| s.direction == d))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(title: &str, category: Option<&str>) -> NewPost {
        NewPost {
            title: title.to_string(),
            category: category.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_post_requires_existing_author() {
        let store = InMemoryStore::new();
        let err = store
            .create_post(UserId::new(), new_post("orphan", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity_type: "user", .. }));
    }

    #[tokio::test]
    async fn test_list_posts_keeps_insertion_order() {
        let store = InMemoryStore::new();
        let alice = store.insert_user("alice").await;
        let bob = store.insert_user("bob").await;

        let p1 = store.create_post(alice.id, new_post("one", None)).await.unwrap();
        let p2 = store.create_post(bob.id, new_post("two", None)).await.unwrap();
        let p3 = store.create_post(alice.id, new_post("three", None)).await.unwrap();

        let all: Vec<_> = store.list_all_posts().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(all, vec![p1.id, p2.id, p3.id]);

        let by_alice: Vec<_> = store
            .list_posts_by_author(alice.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(by_alice, vec![p1.id, p3.id]);

        assert_eq!(store.find_post_by_id(p2.id).await.unwrap().unwrap().title, "two");
        assert!(store.find_post_by_id(PostId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_swipes_filter_by_user_and_direction() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let other = UserId::new();
        let post = PostId::new();

        for (who, direction) in [
            (user, SwipeDirection::Left),
            (user, SwipeDirection::Right),
            (other, SwipeDirection::Left),
        ] {
            store
                .append_swipe(NewSwipe {
                    user_id: who,
                    post_id: post,
                    direction,
                    swiped_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.list_swipes_by_user(user, None).await.unwrap().len(), 2);
        let lefts = store
            .list_swipes_by_user(user, Some(SwipeDirection::Left))
            .await
            .unwrap();
        assert_eq!(lefts.len(), 1);
        assert_eq!(lefts[0].direction, SwipeDirection::Left);
        assert_eq!(store.swipe_count().await, 3);
    }
}
