//! Time-bounded page cache.
//!
//! Pages are keyed by `(user, limit, offset)` and expire after a fixed TTL.
//! Mutations invalidate every page of the acting user so the next fetch
//! sees server-side counter triggers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::Post;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PageKey {
    user_id: String,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Clone)]
struct CachedPage {
    posts: Vec<Post>,
    stored_at: Instant,
}

/// Per-user feed page cache with a fixed time-to-live.
#[derive(Debug)]
pub struct FeedCache {
    ttl: Duration,
    pages: Mutex<HashMap<PageKey, CachedPage>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pages: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh page for this key, if any. Expired entries are evicted.
    pub fn get(&self, user_id: &str, limit: usize, offset: usize) -> Option<Vec<Post>> {
        let key = PageKey {
            user_id: user_id.to_string(),
            limit,
            offset,
        };
        let mut pages = self.lock();
        match pages.get(&key) {
            Some(page) if page.stored_at.elapsed() < self.ttl => Some(page.posts.clone()),
            Some(_) => {
                pages.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, user_id: &str, limit: usize, offset: usize, posts: Vec<Post>) {
        let key = PageKey {
            user_id: user_id.to_string(),
            limit,
            offset,
        };
        self.lock().insert(
            key,
            CachedPage {
                posts,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every page belonging to `user_id`. Returns how many were dropped.
    pub fn invalidate_user(&self, user_id: &str) -> usize {
        let mut pages = self.lock();
        let before = pages.len();
        pages.retain(|key, _| key.user_id != user_id);
        before - pages.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PageKey, CachedPage>> {
        // A panic while holding the lock leaves the map consistent, so a
        // poisoned lock is still usable.
        self.pages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedOrigin;

    fn page(ids: &[&str]) -> Vec<Post> {
        ids.iter()
            .map(|id| Post::new(*id, "author", FeedOrigin::Following))
            .collect()
    }

    #[tokio::test]
    async fn test_get_after_put() {
        let cache = FeedCache::new(Duration::from_secs(300));
        cache.put("u1", 20, 0, page(&["a", "b"]));
        let cached = cache.get("u1", 20, 0).unwrap();
        assert_eq!(cached.len(), 2);
        assert!(cache.get("u1", 20, 20).is_none());
        assert!(cache.get("u2", 20, 0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = FeedCache::new(Duration::from_secs(300));
        cache.put("u1", 20, 0, page(&["a"]));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("u1", 20, 0).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("u1", 20, 0).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_user_keeps_other_users() {
        let cache = FeedCache::new(Duration::from_secs(300));
        cache.put("u1", 20, 0, page(&["a"]));
        cache.put("u1", 20, 20, page(&["b"]));
        cache.put("u12", 20, 0, page(&["c"]));

        assert_eq!(cache.invalidate_user("u1"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("u12", 20, 0).is_some());
    }
}
