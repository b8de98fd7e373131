//! PostgreSQL backend for the storage seams.
//!
//! Posts enumerate by `(created_at, id)`; swipes by their insertion sequence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{PostStore, SwipeLedger, UserDirectory};
use crate::database::{Database, Transaction};
use crate::error::{Error, Result};
use crate::models::{
    NewPost, NewSwipe, Post, PostId, SwipeDirection, SwipeId, SwipeRecord, User, UserId,
};

const POST_COLUMNS: &str =
    "id, author_id, title, description, stack, category, image, created_at";

const SWIPE_COLUMNS: &str = "id, user_id, post_id, direction, swiped_at";

/// sqlx-backed implementation of [`PostStore`], [`SwipeLedger`] and [`UserDirectory`]
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Raw swipe row; direction is stored as text and checked on the way out
#[derive(Debug, sqlx::FromRow)]
struct SwipeRow {
    id: SwipeId,
    user_id: UserId,
    post_id: PostId,
    direction: String,
    swiped_at: DateTime<Utc>,
}

impl TryFrom<SwipeRow> for SwipeRecord {
    type Error = Error;

    fn try_from(row: SwipeRow) -> Result<Self> {
        let direction = row.direction.parse::<SwipeDirection>().map_err(|_| {
            Error::storage(format!(
                "swipe {} has unreadable direction '{}'",
                row.id, row.direction
            ))
        })?;

        Ok(SwipeRecord {
            id: row.id,
            user_id: row.user_id,
            post_id: row.post_id,
            direction,
            swiped_at: row.swiped_at,
        })
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn create_post(&self, author: UserId, post: NewPost) -> Result<Post> {
        let mut tx = Transaction::begin(self.db.pool()).await?;

        // Lock the author row so it cannot vanish before the insert lands
        let author_exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM users WHERE id = $1 FOR KEY SHARE")
                .bind(author)
                .fetch_optional(tx.conn())
                .await?;
        if author_exists.is_none() {
            return Err(Error::not_found("user", author));
        }

        let created = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (author_id, title, description, stack, category, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(author)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.stack)
        .bind(&post.category)
        .bind(&post.image)
        .fetch_one(tx.conn())
        .await?;

        tx.commit().await?;

        debug!("Inserted post {} by {}", created.id, author);
        Ok(created)
    }

    async fn find_post_by_id(&self, id: PostId) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(post)
    }

    async fn list_all_posts(&self) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at, id"
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(posts)
    }

    async fn list_posts_by_author(&self, author: UserId) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = $1 ORDER BY created_at, id"
        ))
        .bind(author)
        .fetch_all(self.db.pool())
        .await?;

        Ok(posts)
    }
}

#[async_trait]
impl SwipeLedger for PgStore {
    async fn append_swipe(&self, swipe: NewSwipe) -> Result<SwipeRecord> {
        let row = sqlx::query_as::<_, SwipeRow>(&format!(
            r#"
            INSERT INTO swipes (user_id, post_id, direction, swiped_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {SWIPE_COLUMNS}
            "#
        ))
        .bind(swipe.user_id)
        .bind(swipe.post_id)
        .bind(swipe.direction.as_str())
        .bind(swipe.swiped_at)
        .fetch_one(self.db.pool())
        .await?;

        row.try_into()
    }

    async fn list_swipes_by_user(
        &self,
        user: UserId,
        direction: Option<SwipeDirection>,
    ) -> Result<Vec<SwipeRecord>> {
        let rows = sqlx::query_as::<_, SwipeRow>(&format!(
            r#"
            SELECT {SWIPE_COLUMNS} FROM swipes
            WHERE user_id = $1 AND ($2::text IS NULL OR direction = $2)
            ORDER BY seq
            "#
        ))
        .bind(user)
        .bind(direction.map(|d| d.as_str()))
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(SwipeRecord::try_from).collect()
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(user)
    }
}
