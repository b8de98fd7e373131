//! Swipe Recorder
//!
//! Validates a single swipe against the user directory and post store, then
//! appends it to the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::metrics;
use crate::error::{Error, Result};
use crate::models::{parse_swipe_time, NewSwipe, PostId, SwipeDirection, SwipeRecord, UserId};
use crate::store::{PostStore, SwipeLedger, UserDirectory};

/// What to do when a user swipes the same post again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every swipe appends a record
    #[default]
    Accumulate,
    /// A repeat in the same direction returns the earlier record instead
    OnePerDirection,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accumulate" => Ok(Self::Accumulate),
            "one_per_direction" => Ok(Self::OnePerDirection),
            other => Err(Error::invalid_argument(format!(
                "unknown duplicate policy '{}'",
                other
            ))),
        }
    }
}

/// A validated swipe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeCommand {
    pub user_id: UserId,
    pub post_id: PostId,
    pub direction: SwipeDirection,
    /// Client-supplied swipe time, if one parsed
    pub swiped_at: Option<DateTime<Utc>>,
}

impl SwipeCommand {
    pub fn new(user_id: UserId, post_id: PostId, direction: SwipeDirection) -> Self {
        Self {
            user_id,
            post_id,
            direction,
            swiped_at: None,
        }
    }

    /// Build a command from raw request text.
    ///
    /// An unknown direction is an `InvalidArgument`. An unparseable timestamp
    /// is dropped so the recorder falls back to the current time.
    pub fn parse(
        user_id: UserId,
        post_id: PostId,
        direction: &str,
        swiped_at: Option<&str>,
    ) -> Result<Self> {
        let direction = direction.parse::<SwipeDirection>()?;
        let swiped_at = swiped_at.and_then(|raw| {
            let parsed = parse_swipe_time(raw);
            if parsed.is_none() {
                debug!("Ignoring unparseable swipe time '{}'", raw);
            }
            parsed
        });

        Ok(Self {
            user_id,
            post_id,
            direction,
            swiped_at,
        })
    }
}

/// Records swipes after checking that the user and post exist
#[derive(Clone)]
pub struct SwipeRecorder {
    users: Arc<dyn UserDirectory>,
    posts: Arc<dyn PostStore>,
    ledger: Arc<dyn SwipeLedger>,
    policy: DuplicatePolicy,
}

impl SwipeRecorder {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        posts: Arc<dyn PostStore>,
        ledger: Arc<dyn SwipeLedger>,
    ) -> Self {
        Self {
            users,
            posts,
            ledger,
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Record one swipe and return the persisted record.
    pub async fn record_swipe(&self, command: SwipeCommand) -> Result<SwipeRecord> {
        if self.users.find_user_by_id(command.user_id).await?.is_none() {
            return Err(Error::not_found("user", command.user_id));
        }
        if self.posts.find_post_by_id(command.post_id).await?.is_none() {
            return Err(Error::not_found("post", command.post_id));
        }

        if self.policy == DuplicatePolicy::OnePerDirection {
            if let Some(existing) = self.existing_swipe(&command).await? {
                debug!(
                    "Swipe {} by {} on {} already recorded as {}",
                    command.direction, command.user_id, command.post_id, existing.id
                );
                metrics::record_deduplicated_swipe(command.direction);
                return Ok(existing);
            }
        }

        let record = self
            .ledger
            .append_swipe(NewSwipe {
                user_id: command.user_id,
                post_id: command.post_id,
                direction: command.direction,
                swiped_at: command.swiped_at.unwrap_or_else(Utc::now),
            })
            .await?;

        metrics::record_swipe(record.direction);
        info!(
            "👆 Recorded {} swipe: user={}, post={}",
            record.direction, record.user_id, record.post_id
        );

        Ok(record)
    }

    async fn existing_swipe(&self, command: &SwipeCommand) -> Result<Option<SwipeRecord>> {
        let swipes = self
            .ledger
            .list_swipes_by_user(command.user_id, Some(command.direction))
            .await?;
        Ok(swipes.into_iter().find(|s| s.post_id == command.post_id))
    }
}
