//! SwipeFeed library crate
//!
//! Swipe-based post feed: a feed engine that hides own and already-swiped
//! posts, a swipe recorder, and the storage seams both sit on.
//! Re-exports core modules for integration tests and the service binary.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use database::Database;
pub use error::{Error, Result};
pub use feed::{CategoryFilter, DuplicatePolicy, FeedEngine, FeedQuery, SwipeCommand, SwipeInbox, SwipeRecorder};
pub use models::{InboxEntry, NewPost, Post, PostId, SwipeDirection, SwipeRecord, User, UserId};
pub use store::{InMemoryStore, PgStore, PostStore, SwipeLedger, UserDirectory};
