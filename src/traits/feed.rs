//! Feed data provider trait abstraction.
//!
//! The feed controller never talks to the backend directly; it consumes a
//! [`FeedProvider`]. The production implementation lives in
//! [`crate::provider`], the test double in [`crate::adapters::mock`].

use async_trait::async_trait;

use crate::error::FeedResult;
use crate::models::{FeedAnalytics, Post};

/// Page request for [`FeedProvider::get_feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedQuery {
    pub limit: usize,
    pub offset: usize,
    /// Bypass any cached page.
    pub refresh: bool,
}

impl FeedQuery {
    pub fn first_page(limit: usize) -> Self {
        Self {
            limit,
            offset: 0,
            refresh: false,
        }
    }
}

/// Source of feed pages and sink of engagement mutations.
///
/// Pages must be order-consistent for a given offset when no writes
/// intervene; the controller never re-sorts them.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Fetch one ordered page of the user's feed.
    async fn get_feed(&self, user_id: &str, query: FeedQuery) -> FeedResult<Vec<Post>>;

    /// Aggregate counts over a post sequence.
    fn analytics(&self, posts: &[Post]) -> FeedAnalytics {
        FeedAnalytics::from_posts(posts)
    }

    async fn like(&self, user_id: &str, post_id: &str) -> FeedResult<()>;

    async fn unlike(&self, user_id: &str, post_id: &str) -> FeedResult<()>;

    /// Cast a score for a competition entry.
    async fn vote(&self, user_id: &str, post_id: &str, score: u8) -> FeedResult<()>;

    async fn report(&self, user_id: &str, post_id: &str, reason: &str) -> FeedResult<()>;

    /// Warm whatever the provider caches. Failures are swallowed.
    async fn preload(&self, user_id: &str);

    /// Drop everything cached for this user.
    fn invalidate_cache(&self, user_id: &str);

    async fn recommendations(&self, user_id: &str, limit: usize) -> FeedResult<Vec<Post>>;
}
