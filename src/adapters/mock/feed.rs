//! Scriptable feed provider for controller tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::error::{FeedError, FeedResult, NetworkError};
use crate::models::{FeedOrigin, Post};
use crate::traits::{FeedProvider, FeedQuery};

/// A call made against [`MockFeedProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    GetFeed { user_id: String, query: FeedQuery },
    Like { user_id: String, post_id: String },
    Unlike { user_id: String, post_id: String },
    Vote { user_id: String, post_id: String, score: u8 },
    Report { user_id: String, post_id: String, reason: String },
    Preload { user_id: String },
    InvalidateCache { user_id: String },
    Recommendations { user_id: String, limit: usize },
}

/// Feed provider returning queued pages and recording every call.
///
/// Pages are served in the order they were pushed; once the queue is empty
/// every fetch returns an empty page. Mutations succeed unless a failure
/// has been set with [`MockFeedProvider::fail_mutations`].
///
/// # Example
///
/// ```ignore
/// let provider = MockFeedProvider::new();
/// provider.push_page(MockFeedProvider::page("a", 20, FeedOrigin::Following));
/// provider.push_error(FeedError::from(NetworkError::Cancelled));
/// ```
#[derive(Debug, Clone)]
pub struct MockFeedProvider {
    pages: Arc<Mutex<VecDeque<FeedResult<Vec<Post>>>>>,
    recommendations: Arc<Mutex<FeedResult<Vec<Post>>>>,
    mutation_failure: Arc<Mutex<Option<FeedError>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    gate: Arc<watch::Sender<bool>>,
}

impl MockFeedProvider {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            pages: Arc::new(Mutex::new(VecDeque::new())),
            recommendations: Arc::new(Mutex::new(Ok(Vec::new()))),
            mutation_failure: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(gate),
        }
    }

    /// `count` posts with ids `{prefix}-0`, `{prefix}-1`, ...
    pub fn page(prefix: &str, count: usize, origin: FeedOrigin) -> Vec<Post> {
        (0..count)
            .map(|i| Post::new(format!("{}-{}", prefix, i), "author", origin))
            .collect()
    }

    pub fn push_page(&self, posts: Vec<Post>) {
        self.pages.lock().unwrap().push_back(Ok(posts));
    }

    pub fn push_error(&self, err: FeedError) {
        self.pages.lock().unwrap().push_back(Err(err));
    }

    pub fn set_recommendations(&self, result: FeedResult<Vec<Post>>) {
        *self.recommendations.lock().unwrap() = result;
    }

    /// Make like, unlike, vote and report fail with a connection error.
    pub fn fail_mutations(&self, fail: bool) {
        *self.mutation_failure.lock().unwrap() = fail.then(|| {
            FeedError::Network(NetworkError::ConnectionFailed {
                url: "mock://feed".to_string(),
                message: "connection refused".to_string(),
            })
        });
    }

    /// Hold `get_feed` and `recommendations` calls until
    /// [`MockFeedProvider::release_fetches`]. Each call takes its result
    /// before waiting.
    pub fn hold_fetches(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_fetches(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Queries of every `get_feed` call, in order.
    pub fn feed_queries(&self) -> Vec<FeedQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::GetFeed { query, .. } => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_for_gate(&self) {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
    }

    fn mutation_result(&self) -> FeedResult<()> {
        match self.mutation_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for MockFeedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedProvider for MockFeedProvider {
    async fn get_feed(&self, user_id: &str, query: FeedQuery) -> FeedResult<Vec<Post>> {
        self.record(ProviderCall::GetFeed {
            user_id: user_id.to_string(),
            query,
        });
        // Take the page before waiting so concurrent fetches keep call order.
        let page = self.pages.lock().unwrap().pop_front();
        self.wait_for_gate().await;
        page.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn like(&self, user_id: &str, post_id: &str) -> FeedResult<()> {
        self.record(ProviderCall::Like {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
        });
        self.mutation_result()
    }

    async fn unlike(&self, user_id: &str, post_id: &str) -> FeedResult<()> {
        self.record(ProviderCall::Unlike {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
        });
        self.mutation_result()
    }

    async fn vote(&self, user_id: &str, post_id: &str, score: u8) -> FeedResult<()> {
        self.record(ProviderCall::Vote {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            score,
        });
        self.mutation_result()
    }

    async fn report(&self, user_id: &str, post_id: &str, reason: &str) -> FeedResult<()> {
        self.record(ProviderCall::Report {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            reason: reason.to_string(),
        });
        self.mutation_result()
    }

    async fn preload(&self, user_id: &str) {
        self.record(ProviderCall::Preload {
            user_id: user_id.to_string(),
        });
    }

    fn invalidate_cache(&self, user_id: &str) {
        self.record(ProviderCall::InvalidateCache {
            user_id: user_id.to_string(),
        });
    }

    async fn recommendations(&self, user_id: &str, limit: usize) -> FeedResult<Vec<Post>> {
        self.record(ProviderCall::Recommendations {
            user_id: user_id.to_string(),
            limit,
        });
        let result = self.recommendations.lock().unwrap().clone();
        self.wait_for_gate().await;
        result
    }
}
