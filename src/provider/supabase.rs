//! Feed provider backed by the hosted table/RPC API.
//!
//! Endpoints used:
//! - `POST rpc/get_user_feed` - ranked feed page
//! - `GET posts` - public posts, used when the ranked feed fails
//! - `POST rpc/get_user_recommendations`
//! - `POST likes`, `DELETE likes`, `POST votes`, `POST reports`
//! - `POST rpc/refresh_feed_scores` - admin recompute of ranking scores

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::cache::FeedCache;
use crate::config::{BackendConfig, DEFAULT_CACHE_TTL};
use crate::error::{classify_http_error, BackendError, FeedError, FeedResult};
use crate::models::{FallbackRow, FeedAnalytics, FeedRow, Post};
use crate::traits::{FeedProvider, FeedQuery, Headers, HttpClient, Response};

/// Page size used by [`FeedProvider::preload`].
pub const PRELOAD_FEED_LIMIT: usize = 10;
/// Recommendations fetched by [`FeedProvider::preload`].
pub const PRELOAD_RECOMMENDATION_LIMIT: usize = 5;

const FALLBACK_SELECT: &str = "*,users!posts_author_id_fkey(id,username,avatar_url,full_name)";

/// [`FeedProvider`] over the hosted backend.
///
/// # Example
///
/// ```ignore
/// use trendfeed::adapters::ReqwestHttpClient;
/// use trendfeed::config::BackendConfig;
/// use trendfeed::provider::SupabaseFeedProvider;
///
/// let provider = SupabaseFeedProvider::new(ReqwestHttpClient::new(), BackendConfig::from_env()?);
/// let page = provider.get_feed("user-1", FeedQuery::first_page(20)).await?;
/// ```
pub struct SupabaseFeedProvider<C: HttpClient> {
    client: C,
    config: BackendConfig,
    cache: FeedCache,
}

impl<C: HttpClient> SupabaseFeedProvider<C> {
    pub fn new(client: C, config: BackendConfig) -> Self {
        Self {
            client,
            config,
            cache: FeedCache::new(DEFAULT_CACHE_TTL),
        }
    }

    /// Replace the page cache with one using a different TTL.
    pub fn with_cache_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.cache = FeedCache::new(ttl);
        self
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Ask the backend to recompute ranking scores, then drop every cached
    /// page since all of them are stale.
    pub async fn refresh_feed_scores(&self) -> FeedResult<()> {
        let url = format!("{}/rpc/refresh_feed_scores", self.config.rest_url());
        let response = self.send_post(&url, "{}", &self.headers()).await?;
        check_status(response)?;
        self.cache.clear();
        info!("Feed scores refreshed");
        Ok(())
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("apikey".to_string(), self.config.anon_key.clone());
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.config.bearer_token()),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    fn write_headers(&self) -> Headers {
        let mut headers = self.headers();
        headers.insert("Prefer".to_string(), "return=minimal".to_string());
        headers
    }

    async fn send_post(&self, url: &str, body: &str, headers: &Headers) -> FeedResult<Response> {
        self.client
            .post(url, body, headers)
            .await
            .map_err(|e| FeedError::Network(classify_http_error(e, url)))
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        args: serde_json::Value,
    ) -> FeedResult<T> {
        let url = format!("{}/rpc/{}", self.config.rest_url(), function);
        let response = self.send_post(&url, &args.to_string(), &self.headers()).await?;
        let response = check_status(response)?;
        response
            .json::<T>()
            .map_err(|e| FeedError::decode(format!("{} response", function), e))
    }

    async fn insert(&self, table: &str, row: serde_json::Value) -> FeedResult<()> {
        let url = format!("{}/{}", self.config.rest_url(), table);
        let response = self
            .send_post(&url, &row.to_string(), &self.write_headers())
            .await?;
        check_status(response)?;
        Ok(())
    }

    async fn ranked_feed(&self, user_id: &str, query: FeedQuery) -> FeedResult<Vec<Post>> {
        let rows: Vec<FeedRow> = self
            .rpc(
                "get_user_feed",
                json!({
                    "current_user_id": user_id,
                    "limit_count": query.limit,
                    "offset_count": query.offset,
                }),
            )
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn fallback_feed(&self, limit: usize, offset: usize) -> FeedResult<Vec<Post>> {
        let url = format!(
            "{}/posts?select={}&visibility=eq.public&order=created_at.desc&offset={}&limit={}",
            self.config.rest_url(),
            FALLBACK_SELECT,
            offset,
            limit
        );
        let response = self
            .client
            .get(&url, &self.headers())
            .await
            .map_err(|e| FeedError::Network(classify_http_error(e, &url)))?;
        let rows: Vec<FallbackRow> = check_status(response)?
            .json()
            .map_err(|e| FeedError::decode("fallback posts", e))?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

/// Turn a non-2xx response into a [`BackendError`].
fn check_status(response: Response) -> FeedResult<Response> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(BackendError::from_body(response.status, &response.body).into())
    }
}

fn log_composition(posts: &[Post]) {
    let analytics = FeedAnalytics::from_posts(posts);
    debug!(
        total = analytics.total_posts,
        mutual_friends = analytics.mutual_friends_posts,
        following = analytics.following_posts,
        own = analytics.own_posts,
        trending = analytics.trending_posts,
        competitions = analytics.competition_posts,
        "Feed page loaded"
    );
}

#[async_trait]
impl<C: HttpClient> FeedProvider for SupabaseFeedProvider<C> {
    async fn get_feed(&self, user_id: &str, query: FeedQuery) -> FeedResult<Vec<Post>> {
        if !query.refresh {
            if let Some(cached) = self.cache.get(user_id, query.limit, query.offset) {
                debug!(user_id, offset = query.offset, "Serving feed page from cache");
                return Ok(cached);
            }
        }

        match self.ranked_feed(user_id, query).await {
            Ok(posts) => {
                log_composition(&posts);
                self.cache
                    .put(user_id, query.limit, query.offset, posts.clone());
                Ok(posts)
            }
            Err(err) => {
                warn!(user_id, error = %err, "Ranked feed failed, using fallback feed");
                self.fallback_feed(query.limit, query.offset).await
            }
        }
    }

    async fn like(&self, user_id: &str, post_id: &str) -> FeedResult<()> {
        self.insert("likes", json!({ "user_id": user_id, "post_id": post_id }))
            .await?;
        self.cache.invalidate_user(user_id);
        Ok(())
    }

    async fn unlike(&self, user_id: &str, post_id: &str) -> FeedResult<()> {
        let url = format!(
            "{}/likes?user_id=eq.{}&post_id=eq.{}",
            self.config.rest_url(),
            urlencoding::encode(user_id),
            urlencoding::encode(post_id)
        );
        let response = self
            .client
            .delete(&url, &self.write_headers())
            .await
            .map_err(|e| FeedError::Network(classify_http_error(e, &url)))?;
        check_status(response)?;
        self.cache.invalidate_user(user_id);
        Ok(())
    }

    async fn vote(&self, user_id: &str, post_id: &str, score: u8) -> FeedResult<()> {
        self.insert(
            "votes",
            json!({ "voter_id": user_id, "entry_id": post_id, "score": score }),
        )
        .await?;
        self.cache.invalidate_user(user_id);
        Ok(())
    }

    async fn report(&self, user_id: &str, post_id: &str, reason: &str) -> FeedResult<()> {
        self.insert(
            "reports",
            json!({ "reporter_id": user_id, "post_id": post_id, "reason": reason }),
        )
        .await
    }

    async fn preload(&self, user_id: &str) {
        let query = FeedQuery::first_page(PRELOAD_FEED_LIMIT);
        if let Err(err) = self.get_feed(user_id, query).await {
            warn!(user_id, error = %err, "Feed preload failed");
            return;
        }
        if let Err(err) = self
            .recommendations(user_id, PRELOAD_RECOMMENDATION_LIMIT)
            .await
        {
            warn!(user_id, error = %err, "Recommendation preload failed");
            return;
        }
        debug!(user_id, "Feed preloaded");
    }

    fn invalidate_cache(&self, user_id: &str) {
        let dropped = self.cache.invalidate_user(user_id);
        debug!(user_id, dropped, "Feed cache invalidated");
    }

    async fn recommendations(&self, user_id: &str, limit: usize) -> FeedResult<Vec<Post>> {
        let rows: Option<Vec<FeedRow>> = self
            .rpc(
                "get_user_recommendations",
                json!({ "current_user_id": user_id, "limit_count": limit }),
            )
            .await?;
        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .map(Post::from)
            .collect())
    }
}
