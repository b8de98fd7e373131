//! Storage seams used by the feed core
//!
//! The engine and recorder only see these traits. Two backends implement
//! all of them:
//!
//! - [`memory::InMemoryStore`] keeps everything in process (tests, local runs)
//! - [`postgres::PgStore`] persists to PostgreSQL through sqlx

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewPost, NewSwipe, Post, PostId, SwipeDirection, SwipeRecord, User, UserId};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Durable collection of authored posts
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a post for `author` and return it with its assigned id.
    ///
    /// Fails with `NotFound` if the author does not exist.
    async fn create_post(&self, author: UserId, post: NewPost) -> Result<Post>;

    async fn find_post_by_id(&self, id: PostId) -> Result<Option<Post>>;

    /// All posts in the store's natural enumeration order
    async fn list_all_posts(&self) -> Result<Vec<Post>>;

    async fn list_posts_by_author(&self, author: UserId) -> Result<Vec<Post>>;
}

/// Append-mostly record of every swipe a user has made
#[async_trait]
pub trait SwipeLedger: Send + Sync {
    async fn append_swipe(&self, swipe: NewSwipe) -> Result<SwipeRecord>;

    /// Swipes by `user` in append order, optionally restricted to one direction
    async fn list_swipes_by_user(
        &self,
        user: UserId,
        direction: Option<SwipeDirection>,
    ) -> Result<Vec<SwipeRecord>>;
}

/// Read-only view of identities owned by the external auth service
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>>;
}
