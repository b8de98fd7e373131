//! Read views over a user's swipe history: the posts they accepted and the
//! ids of the posts they rejected.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{InboxEntry, PostId, SwipeDirection, UserId};
use crate::store::{PostStore, SwipeLedger};

#[derive(Clone)]
pub struct SwipeInbox {
    posts: Arc<dyn PostStore>,
    ledger: Arc<dyn SwipeLedger>,
}

impl SwipeInbox {
    pub fn new(posts: Arc<dyn PostStore>, ledger: Arc<dyn SwipeLedger>) -> Self {
        Self { posts, ledger }
    }

    /// Posts the user swiped RIGHT on, one entry per post, newest swipe first.
    pub async fn right_swiped(&self, user: UserId) -> Result<Vec<InboxEntry>> {
        let swipes = self
            .ledger
            .list_swipes_by_user(user, Some(SwipeDirection::Right))
            .await?;

        let mut latest: HashMap<PostId, DateTime<Utc>> = HashMap::new();
        for swipe in swipes {
            latest
                .entry(swipe.post_id)
                .and_modify(|t| *t = (*t).max(swipe.swiped_at))
                .or_insert(swipe.swiped_at);
        }

        let mut entries = Vec::with_capacity(latest.len());
        for (post_id, swiped_at) in latest {
            match self.posts.find_post_by_id(post_id).await? {
                Some(post) => entries.push(InboxEntry { post, swiped_at }),
                None => warn!("Right-swiped post {} for user {} no longer exists", post_id, user),
            }
        }

        entries.sort_by(|a, b| {
            b.swiped_at
                .cmp(&a.swiped_at)
                .then_with(|| a.post.id.cmp(&b.post.id))
        });

        debug!("Inbox for user {}: {} posts", user, entries.len());
        Ok(entries)
    }

    /// Distinct ids of posts the user swiped LEFT on, in first-swipe order.
    pub async fn left_swiped_ids(&self, user: UserId) -> Result<Vec<PostId>> {
        let swipes = self
            .ledger
            .list_swipes_by_user(user, Some(SwipeDirection::Left))
            .await?;

        let mut seen = HashSet::new();
        Ok(swipes
            .into_iter()
            .map(|s| s.post_id)
            .filter(|id| seen.insert(*id))
            .collect())
    }
}
