//! Recommended posts for a user.
//!
//! Read-only: fetched on mount, again whenever the user or limit changes,
//! and on demand through [`Recommendations::refetch`].

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::Post;
use crate::traits::FeedProvider;

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

const FALLBACK_ERROR: &str = "Failed to load recommendations";

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationsState {
    pub recommendations: Vec<Post>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for RecommendationsState {
    fn default() -> Self {
        Self {
            recommendations: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Params {
    user_id: Option<String>,
    limit: usize,
}

/// Recommendations loader bound to a user id and limit.
pub struct Recommendations<P: FeedProvider> {
    provider: Arc<P>,
    params: Mutex<(Params, u64)>,
    state: watch::Sender<RecommendationsState>,
}

impl<P: FeedProvider> Recommendations<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let (state, _) = watch::channel(RecommendationsState::default());
        Self {
            provider,
            params: Mutex::new((
                Params {
                    user_id: None,
                    limit: DEFAULT_RECOMMENDATION_LIMIT,
                },
                0,
            )),
            state,
        }
    }

    /// Create and run the first fetch.
    pub async fn mount(provider: Arc<P>, user_id: Option<String>, limit: usize) -> Self {
        let recommendations = Self::new(provider);
        recommendations.set_params(user_id, limit);
        recommendations.refetch().await;
        recommendations
    }

    /// Change the user or limit. Fetches only when either actually changed.
    pub async fn update(&self, user_id: Option<String>, limit: usize) {
        if self.set_params(user_id, limit) {
            self.refetch().await;
        }
    }

    /// Fetch with the current parameters. No-op without a user.
    pub async fn refetch(&self) {
        let (params, generation) = self.params().clone();
        let Some(user_id) = params.user_id else {
            return;
        };

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = self.provider.recommendations(&user_id, params.limit).await;

        self.state.send_if_modified(|state| {
            let current = self.params();
            if current.1 != generation {
                debug!(user_id = %user_id, "Discarding recommendations for stale parameters");
                // With no user there is no follow-up fetch to clear the flag.
                let settle = current.0.user_id.is_none() && state.loading;
                if settle {
                    state.loading = false;
                }
                return settle;
            }
            drop(current);

            match result {
                Ok(posts) => {
                    debug!(count = posts.len(), "Recommendations loaded");
                    state.recommendations = posts;
                }
                Err(err) => {
                    warn!(error = %err, "Error fetching recommendations");
                    let message = err.to_string();
                    state.error = Some(if message.trim().is_empty() {
                        FALLBACK_ERROR.to_string()
                    } else {
                        message
                    });
                }
            }
            state.loading = false;
            true
        });
    }

    pub fn state(&self) -> RecommendationsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecommendationsState> {
        self.state.subscribe()
    }

    fn params(&self) -> MutexGuard<'_, (Params, u64)> {
        self.params.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns whether the parameters changed.
    fn set_params(&self, user_id: Option<String>, limit: usize) -> bool {
        let next = Params { user_id, limit };
        let mut guard = self.params();
        if guard.0 == next {
            return false;
        }
        guard.0 = next;
        guard.1 += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockFeedProvider, ProviderCall};
    use crate::error::{FeedError, NetworkError};
    use crate::models::FeedOrigin;

    #[tokio::test]
    async fn test_mount_fetches_once() {
        let provider = Arc::new(MockFeedProvider::new());
        provider.set_recommendations(Ok(MockFeedProvider::page("r", 3, FeedOrigin::Trending)));

        let recs = Recommendations::mount(provider.clone(), Some("u1".to_string()), 10).await;

        let state = recs.state();
        assert!(!state.loading);
        assert_eq!(state.recommendations.len(), 3);
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::Recommendations {
                user_id: "u1".to_string(),
                limit: 10
            }]
        );
    }

    #[tokio::test]
    async fn test_no_user_is_noop() {
        let provider = Arc::new(MockFeedProvider::new());
        let recs = Recommendations::mount(provider.clone(), None, 10).await;
        assert!(recs.state().loading);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_refetches_only_on_change() {
        let provider = Arc::new(MockFeedProvider::new());
        let recs = Recommendations::mount(provider.clone(), Some("u1".to_string()), 10).await;

        recs.update(Some("u1".to_string()), 10).await;
        assert_eq!(provider.calls().len(), 1);

        recs.update(Some("u1".to_string()), 5).await;
        recs.update(Some("u2".to_string()), 5).await;
        assert_eq!(provider.calls().len(), 3);

        recs.refetch().await;
        assert_eq!(provider.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_error_recorded_and_list_kept() {
        let provider = Arc::new(MockFeedProvider::new());
        provider.set_recommendations(Ok(MockFeedProvider::page("r", 2, FeedOrigin::Trending)));
        let recs = Recommendations::mount(provider.clone(), Some("u1".to_string()), 10).await;

        provider.set_recommendations(Err(FeedError::Network(NetworkError::Timeout {
            operation: "recommendations".to_string(),
        })));
        recs.refetch().await;

        let state = recs.state();
        assert_eq!(state.error.as_deref(), Some("recommendations timed out"));
        assert_eq!(state.recommendations.len(), 2);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_sign_out_during_fetch_settles_loading() {
        let provider = Arc::new(MockFeedProvider::new());
        provider.set_recommendations(Ok(MockFeedProvider::page("r", 3, FeedOrigin::Trending)));
        provider.hold_fetches();
        let recs = Arc::new(Recommendations::new(provider.clone()));
        recs.set_params(Some("u1".to_string()), 10);

        let fetch = {
            let recs = recs.clone();
            tokio::spawn(async move { recs.refetch().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(recs.state().loading);

        recs.update(None, 10).await;
        provider.release_fetches();
        fetch.await.unwrap();

        let state = recs.state();
        assert!(!state.loading);
        assert!(state.recommendations.is_empty());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_user_switch_during_fetch_keeps_new_result() {
        let provider = Arc::new(MockFeedProvider::new());
        provider.hold_fetches();
        let recs = Arc::new(Recommendations::new(provider.clone()));
        recs.set_params(Some("u1".to_string()), 10);

        let stale = {
            let recs = recs.clone();
            tokio::spawn(async move { recs.refetch().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        provider.set_recommendations(Ok(MockFeedProvider::page("u2", 2, FeedOrigin::Trending)));
        let fresh = {
            let recs = recs.clone();
            tokio::spawn(async move { recs.update(Some("u2".to_string()), 10).await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        provider.release_fetches();
        stale.await.unwrap();
        fresh.await.unwrap();

        let state = recs.state();
        assert!(!state.loading);
        assert_eq!(state.recommendations.len(), 2);
        assert_eq!(state.recommendations[0].id, "u2-0");
    }
}
