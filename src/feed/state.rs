use crate::config::DEFAULT_PAGE_LIMIT;
use crate::models::{FeedAnalytics, FeedComposition, Post};

use super::cursor::PaginationCursor;

/// Message stored when a failure carries no text of its own.
pub const FALLBACK_FETCH_ERROR: &str = "Failed to load feed";

/// Everything the feed screen renders from.
///
/// A fresh state is `loading` with `has_more` set, so the first render shows
/// a spinner rather than an empty feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    /// Server order, pages appended as loaded
    pub posts: Vec<Post>,
    pub loading: bool,
    pub refreshing: bool,
    pub loading_more: bool,
    pub has_more: bool,
    pub error: Option<String>,
    /// `None` until the first successful fetch
    pub analytics: Option<FeedAnalytics>,
    pub cursor: PaginationCursor,
}

impl FeedState {
    pub fn new(limit: usize) -> Self {
        Self {
            posts: Vec::new(),
            loading: true,
            refreshing: false,
            loading_more: false,
            has_more: true,
            error: None,
            analytics: None,
            cursor: PaginationCursor::new(limit),
        }
    }

    /// Nothing to show and nothing on the way.
    pub fn is_empty(&self) -> bool {
        !self.loading && self.posts.is_empty()
    }

    /// A fetch failed and there is nothing else to show.
    pub fn has_error(&self) -> bool {
        self.error.is_some() && self.posts.is_empty()
    }

    pub fn feed_composition(&self) -> Option<FeedComposition> {
        self.analytics.as_ref().map(FeedAnalytics::composition)
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.refreshing || self.loading_more
    }

    pub fn post(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub(crate) fn clear_busy(&mut self) {
        self.loading = false;
        self.refreshing = false;
        self.loading_more = false;
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}
