//! Feed Module
//!
//! Decides which posts a user sees next and records what they did with them.
//!
//! ## Components
//!
//! 1. **Engine** - computes the eligible feed for a user
//! 2. **Recorder** - validates and appends swipes to the ledger
//! 3. **Inbox** - read views over past swipes (accepted posts, rejected ids)
//! 4. **Category** - normalization of the optional category filter
//!
//! ## Eligibility
//!
//! A post is eligible for user U when all of these hold:
//! - U is not its author
//! - U has no swipe on it, in either direction, however many times recorded
//! - its trimmed, lower-cased category is in the filter (when one is active)

pub mod category;
pub mod engine;
pub mod inbox;
pub mod metrics;
pub mod recorder;

pub use category::CategoryFilter;
pub use engine::{FeedEngine, FeedQuery};
pub use inbox::SwipeInbox;
pub use recorder::{DuplicatePolicy, SwipeCommand, SwipeRecorder};
