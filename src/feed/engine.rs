//! Feed Engine
//!
//! Computes the posts a user can still swipe on:
//! every post, minus the ones the user wrote, minus the ones the user has
//! swiped on in either direction, minus those outside the category filter.
//! Nothing is cached; each call reads the stores afresh.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::category::CategoryFilter;
use super::metrics::{self, PerformanceTimer};
use crate::error::Result;
use crate::models::{Post, PostId, UserId};
use crate::store::{PostStore, SwipeLedger};

/// Parameters of one feed computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub user_id: UserId,
    pub categories: CategoryFilter,
}

impl FeedQuery {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            categories: CategoryFilter::Unfiltered,
        }
    }

    pub fn with_categories<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories = CategoryFilter::new(labels);
        self
    }
}

/// Feed engine over a post store and a swipe ledger
#[derive(Clone)]
pub struct FeedEngine {
    posts: Arc<dyn PostStore>,
    ledger: Arc<dyn SwipeLedger>,
    slow_threshold: Duration,
}

impl FeedEngine {
    pub fn new(posts: Arc<dyn PostStore>, ledger: Arc<dyn SwipeLedger>) -> Self {
        Self {
            posts,
            ledger,
            slow_threshold: Duration::from_millis(250),
        }
    }

    /// Feed computations slower than this are logged at warn level
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Compute the eligible feed for `query.user_id`.
    ///
    /// The user is not checked for existence; an unknown user simply sees
    /// every post. Order follows the post store's enumeration order.
    pub async fn compute_feed(&self, query: &FeedQuery) -> Result<Vec<Post>> {
        let timer = PerformanceTimer::new("compute_feed");

        let swiped = self.swiped_post_ids(query.user_id).await?;
        let candidates = self.posts.list_all_posts().await?;
        let total = candidates.len();

        let feed = Self::filter_eligible(candidates, query, &swiped);

        debug!(
            "Feed for user {}: {} of {} posts eligible ({} swiped, filter active: {})",
            query.user_id,
            feed.len(),
            total,
            swiped.len(),
            query.categories.is_active()
        );

        metrics::record_feed(feed.len(), timer.elapsed());
        timer.log_if_slow(self.slow_threshold);

        Ok(feed)
    }

    /// Every post id the user has swiped on, in either direction.
    ///
    /// Existence is all that matters, so duplicate records collapse here.
    async fn swiped_post_ids(&self, user: UserId) -> Result<HashSet<PostId>> {
        let swipes = self.ledger.list_swipes_by_user(user, None).await?;
        Ok(swipes.into_iter().map(|s| s.post_id).collect())
    }

    fn filter_eligible(
        candidates: Vec<Post>,
        query: &FeedQuery,
        swiped: &HashSet<PostId>,
    ) -> Vec<Post> {
        candidates
            .into_iter()
            .filter(|post| post.author_id != query.user_id)
            .filter(|post| !swiped.contains(&post.id))
            .filter(|post| query.categories.matches(post.category.as_deref()))
            .collect()
    }
}
