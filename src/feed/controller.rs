//! The feed controller: one user's paginated, optimistically mutated feed.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::auto_refresh::AutoRefresh;
use super::optimistic::{EngagementPatch, OptimisticUpdate};
use super::state::{FeedState, FALLBACK_FETCH_ERROR};
use crate::config::FeedOptions;
use crate::error::{FeedError, FeedResult};
use crate::traits::FeedProvider;

/// Score cast by [`FeedController::vote_for_entry`] callers that have no
/// score of their own.
pub const DEFAULT_VOTE_SCORE: u8 = 5;

/// Result of [`FeedController::report_post`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Reported,
    Failed { message: String },
}

impl ReportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReportOutcome::Reported)
    }
}

/// Which busy flag a fetch raises and how its page is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    /// First load: raises `loading`, clears `error`, replaces posts
    Initial,
    /// Raises `refreshing`, replaces posts
    Refresh,
    /// Raises `loading_more`, appends posts
    LoadMore,
}

impl FetchMode {
    /// A refresh always restarts from the top, even if `load_more` is set.
    fn from_flags(load_more: bool, refresh: bool) -> Self {
        if refresh {
            FetchMode::Refresh
        } else if load_more {
            FetchMode::LoadMore
        } else {
            FetchMode::Initial
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Like,
    Unlike,
    Vote(u8),
}

impl Mutation {
    fn patch(self) -> EngagementPatch {
        match self {
            Mutation::Like => EngagementPatch::Like,
            Mutation::Unlike => EngagementPatch::Unlike,
            Mutation::Vote(_) => EngagementPatch::Vote,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Mutation::Like => "like",
            Mutation::Unlike => "unlike",
            Mutation::Vote(_) => "vote",
        }
    }
}

/// The signed-in identity and a counter bumped whenever it changes.
///
/// Requests remember the generation they started under; a result that
/// comes back under a different generation belongs to a previous identity
/// and is dropped.
#[derive(Debug, Default)]
struct Session {
    user_id: Option<String>,
    generation: u64,
}

struct Inner<P> {
    provider: Arc<P>,
    options: FeedOptions,
    state: watch::Sender<FeedState>,
    session: Mutex<Session>,
    auto_refresh: Mutex<Option<AutoRefresh>>,
}

impl<P> Inner<P> {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn auto_refresh(&self) -> MutexGuard<'_, Option<AutoRefresh>> {
        self.auto_refresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current user and generation, or `None` when signed out.
    fn active(&self) -> Option<(String, u64)> {
        let session = self.session();
        session
            .user_id
            .clone()
            .map(|user_id| (user_id, session.generation))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session().generation == generation
    }
}

/// Paginated feed for one user at a time.
///
/// Cheap to clone; clones share state. State lives in a `watch` channel so
/// a UI can [`subscribe`](FeedController::subscribe) and redraw on change.
/// No lock is held across a provider call.
///
/// # Example
///
/// ```ignore
/// let controller = FeedController::new(Arc::new(provider), FeedOptions::default());
/// controller.set_user(Some("user-1".to_string())).await;
/// controller.like_post("post-9").await;
/// if controller.load_more().await { /* fetched another page */ }
/// ```
pub struct FeedController<P: FeedProvider> {
    inner: Arc<Inner<P>>,
}

impl<P: FeedProvider> Clone for FeedController<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: FeedProvider + 'static> FeedController<P> {
    pub fn new(provider: Arc<P>, options: FeedOptions) -> Self {
        let (state, _) = watch::channel(FeedState::new(options.limit));
        Self {
            inner: Arc::new(Inner {
                provider,
                options,
                state,
                session: Mutex::new(Session::default()),
                auto_refresh: Mutex::new(None),
            }),
        }
    }

    pub fn options(&self) -> &FeedOptions {
        &self.inner.options
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.inner.provider
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.session().user_id.clone()
    }

    /// Copy of the current state.
    pub fn state(&self) -> FeedState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.inner.state.subscribe()
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.inner
            .auto_refresh()
            .as_ref()
            .is_some_and(AutoRefresh::is_running)
    }

    /// Switch identity.
    ///
    /// A new user gets a fresh state, a fire-and-forget provider preload,
    /// an initial refresh and, when enabled, the auto-refresh timer.
    /// Clearing the user stops the timer and resets state. Setting the
    /// same user again does nothing.
    pub async fn set_user(&self, user_id: Option<String>) {
        {
            let mut session = self.inner.session();
            if session.user_id == user_id {
                return;
            }
            session.user_id = user_id.clone();
            session.generation += 1;
        }

        self.stop_auto_refresh();
        self.inner
            .state
            .send_replace(FeedState::new(self.inner.options.limit));

        let Some(user_id) = user_id else {
            info!("Feed user cleared");
            return;
        };
        info!(user_id = %user_id, "Feed user set");

        if self.inner.options.preload {
            let provider = self.inner.provider.clone();
            let preload_user = user_id.clone();
            tokio::spawn(async move {
                provider.preload(&preload_user).await;
            });
        }

        self.start_auto_refresh();
        self.fetch(false, true).await;
    }

    /// Fetch one page.
    ///
    /// Load-more continues from the cursor and appends; anything else
    /// restarts at offset zero and replaces the posts. Without a user this
    /// is a silent no-op.
    pub async fn fetch(&self, load_more: bool, refresh: bool) {
        let Some((user_id, generation)) = self.inner.active() else {
            debug!("No user for feed fetch");
            return;
        };
        let mode = FetchMode::from_flags(load_more, refresh);

        let mut query = None;
        self.inner.state.send_modify(|state| {
            match mode {
                FetchMode::LoadMore => state.loading_more = true,
                FetchMode::Refresh => state.refreshing = true,
                FetchMode::Initial => {
                    state.loading = true;
                    state.error = None;
                }
            }
            query = Some(state.cursor.query(mode == FetchMode::LoadMore, refresh));
        });
        let Some(query) = query else {
            return;
        };

        debug!(
            user_id = %user_id,
            load_more,
            refresh,
            offset = query.offset,
            "Fetching feed"
        );
        let result = self.inner.provider.get_feed(&user_id, query).await;

        let inner = &self.inner;
        inner.state.send_if_modified(|state| {
            // Checked under the state lock so an identity switch cannot land
            // between the check and the write.
            if !inner.is_current(generation) {
                debug!(user_id = %user_id, "Discarding feed page for previous user");
                return false;
            }
            match result {
                Ok(page) => {
                    let received = page.len();
                    if mode == FetchMode::LoadMore {
                        state.posts.extend(page);
                        state.cursor.advance(received);
                    } else {
                        state.posts = page;
                        state.cursor.replace(received);
                    }
                    state.has_more = state.cursor.is_full_page(received);
                    state.error = None;

                    let analytics = inner.provider.analytics(&state.posts);
                    info!(
                        received,
                        total = analytics.total_posts,
                        mutual_friends = analytics.mutual_friends_posts,
                        following = analytics.following_posts,
                        own = analytics.own_posts,
                        trending = analytics.trending_posts,
                        competitions = analytics.competition_posts,
                        has_more = state.has_more,
                        "Feed loaded"
                    );
                    state.analytics = Some(analytics);
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        category = %err.category(),
                        code = err.error_code(),
                        "Error fetching feed"
                    );
                    state.error = Some(fetch_error_message(&err));
                }
            }
            state.clear_busy();
            true
        });
    }

    /// Pull-to-refresh.
    pub async fn on_refresh(&self) {
        self.inner.state.send_modify(|state| state.cursor.reset());
        self.fetch(false, true).await;
    }

    /// Fetch the next page unless one is already loading, the first load is
    /// still running, or the feed is exhausted. Returns whether a fetch was
    /// issued.
    pub async fn load_more(&self) -> bool {
        let ready = {
            let state = self.inner.state.borrow();
            !state.loading_more && state.has_more && !state.loading
        };
        if !ready {
            return false;
        }
        self.fetch(true, false).await;
        true
    }

    pub async fn like_post(&self, post_id: &str) {
        self.mutate(post_id, Mutation::Like).await;
    }

    pub async fn unlike_post(&self, post_id: &str) {
        self.mutate(post_id, Mutation::Unlike).await;
    }

    /// Vote for a competition entry. The local patch only lands on posts
    /// classified as competition entries, but the vote is sent either way.
    pub async fn vote_for_entry(&self, post_id: &str, score: u8) {
        self.mutate(post_id, Mutation::Vote(score)).await;
    }

    /// Report a post. On success every copy of the post is removed
    /// locally. `None` when no user is signed in.
    pub async fn report_post(&self, post_id: &str, reason: &str) -> Option<ReportOutcome> {
        let (user_id, generation) = self.inner.active()?;

        match self.inner.provider.report(&user_id, post_id, reason).await {
            Ok(()) => {
                let inner = &self.inner;
                inner.state.send_if_modified(|state| {
                    if !inner.is_current(generation) {
                        return false;
                    }
                    let before = state.posts.len();
                    state.posts.retain(|p| p.id != post_id);
                    state.posts.len() != before
                });
                info!(post_id, "Post reported");
                Some(ReportOutcome::Reported)
            }
            Err(err) => {
                warn!(post_id, error = %err, "Error reporting post");
                Some(ReportOutcome::Failed {
                    message: err.to_string(),
                })
            }
        }
    }

    /// Drop the provider's cache for this user, then refresh.
    pub async fn clear_cache_and_refresh(&self) {
        let Some((user_id, _)) = self.inner.active() else {
            return;
        };
        self.inner.provider.invalidate_cache(&user_id);
        self.fetch(false, true).await;
    }

    async fn mutate(&self, post_id: &str, mutation: Mutation) {
        let Some((user_id, generation)) = self.inner.active() else {
            return;
        };

        let mut update = None;
        self.inner.state.send_if_modified(|state| {
            update = OptimisticUpdate::begin(&mut state.posts, post_id, mutation.patch());
            update.is_some()
        });

        match self.send_mutation(&user_id, post_id, mutation).await {
            Ok(()) => info!(post_id, action = mutation.name(), "Engagement saved"),
            Err(err) => {
                warn!(post_id, action = mutation.name(), error = %err, "Engagement failed, reverting");
                if let Some(update) = update {
                    let inner = &self.inner;
                    inner.state.send_if_modified(|state| {
                        inner.is_current(generation) && update.revert(&mut state.posts)
                    });
                }
            }
        }
    }

    async fn send_mutation(&self, user_id: &str, post_id: &str, mutation: Mutation) -> FeedResult<()> {
        let provider = &self.inner.provider;
        match mutation {
            Mutation::Like => provider.like(user_id, post_id).await,
            Mutation::Unlike => provider.unlike(user_id, post_id).await,
            Mutation::Vote(score) => provider.vote(user_id, post_id, score).await,
        }
    }

    fn start_auto_refresh(&self) {
        let Some(period) = self.inner.options.auto_refresh_period() else {
            return;
        };
        let weak: Weak<Inner<P>> = Arc::downgrade(&self.inner);
        let timer = AutoRefresh::spawn(period, move || {
            let inner = weak.upgrade()?;
            Some(async move {
                FeedController { inner }.fetch(false, true).await;
            })
        });
        debug!(period_secs = period.as_secs(), "Auto-refresh started");
        *self.inner.auto_refresh() = Some(timer);
    }

    fn stop_auto_refresh(&self) {
        if self.inner.auto_refresh().take().is_some() {
            debug!("Auto-refresh stopped");
        }
    }
}

/// What the feed screen shows for a failed fetch. The full error goes to
/// the log.
fn fetch_error_message(err: &FeedError) -> String {
    let message = err.user_message();
    if message.trim().is_empty() {
        FALLBACK_FETCH_ERROR.to_string()
    } else {
        message
    }
}
