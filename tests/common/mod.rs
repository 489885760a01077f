//! Common test utilities for integration tests.
//!
//! Fixtures for posts and controllers wired to the mock provider, plus the
//! wiremock helpers in [`mocks`].

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;
use std::time::Duration;

use trendfeed::adapters::mock::MockFeedProvider;
use trendfeed::config::FeedOptions;
use trendfeed::feed::FeedController;
use trendfeed::models::{FeedOrigin, Post};

pub const TEST_USER: &str = "user-1";

/// Options with background work disabled so tests control every fetch.
pub fn quiet_options(limit: usize) -> FeedOptions {
    FeedOptions::new()
        .with_limit(limit)
        .unwrap()
        .with_auto_refresh(false)
        .with_preload(false)
}

/// A controller over a fresh mock provider. No user is set yet.
pub fn controller(limit: usize) -> (FeedController<MockFeedProvider>, Arc<MockFeedProvider>) {
    let provider = Arc::new(MockFeedProvider::new());
    let controller = FeedController::new(provider.clone(), quiet_options(limit));
    (controller, provider)
}

/// A controller whose user is signed in and whose first page (`first_page`)
/// has loaded.
pub async fn loaded_controller(
    limit: usize,
    first_page: Vec<Post>,
) -> (FeedController<MockFeedProvider>, Arc<MockFeedProvider>) {
    let (controller, provider) = controller(limit);
    provider.push_page(first_page);
    controller.set_user(Some(TEST_USER.to_string())).await;
    provider.clear_calls();
    (controller, provider)
}

pub fn post(id: &str, origin: FeedOrigin, likes: u32, liked: bool) -> Post {
    Post::new(id, "author-1", origin).with_likes(likes, liked)
}

pub fn ids(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.id.as_str()).collect()
}

/// Let spawned tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub const MINUTE: Duration = Duration::from_secs(60);
