//! Paging behaviour of the feed controller: replace vs append, cursor
//! movement, `has_more`, the load-more guard and failure handling.

mod common;

use common::*;
use trendfeed::adapters::mock::MockFeedProvider;
use trendfeed::error::{FeedError, NetworkError};
use trendfeed::models::FeedOrigin;
use trendfeed::traits::FeedQuery;

#[tokio::test]
async fn test_initial_state_before_user() {
    let (controller, provider) = controller(20);

    let state = controller.state();
    assert!(state.loading);
    assert!(state.has_more);
    assert!(state.posts.is_empty());
    assert!(state.analytics.is_none());

    // Not ready yet: silent no-op, no provider call, no error.
    controller.fetch(false, false).await;
    controller.on_refresh().await;
    assert!(!controller.load_more().await);
    assert!(provider.calls().is_empty());
    assert!(controller.state().error.is_none());
}

#[tokio::test]
async fn test_full_page_then_short_page() {
    let (controller, provider) =
        loaded_controller(20, MockFeedProvider::page("a", 20, FeedOrigin::Following)).await;

    let state = controller.state();
    assert_eq!(state.posts.len(), 20);
    assert!(state.has_more);
    assert_eq!(state.cursor.offset, 20);
    assert!(!state.loading && !state.refreshing && !state.loading_more);

    provider.push_page(MockFeedProvider::page("b", 5, FeedOrigin::Trending));
    assert!(controller.load_more().await);

    let state = controller.state();
    assert_eq!(state.posts.len(), 25);
    assert!(!state.has_more);
    assert_eq!(state.cursor.offset, 25);
    assert_eq!(state.posts[20].id, "b-0");
    assert_eq!(
        provider.feed_queries(),
        vec![FeedQuery {
            limit: 20,
            offset: 20,
            refresh: false
        }]
    );
}

#[tokio::test]
async fn test_refresh_replaces_and_resets_cursor() {
    let (controller, provider) =
        loaded_controller(10, MockFeedProvider::page("a", 10, FeedOrigin::Own)).await;
    provider.push_page(MockFeedProvider::page("b", 10, FeedOrigin::Own));
    controller.load_more().await;
    assert_eq!(controller.state().posts.len(), 20);

    provider.push_page(MockFeedProvider::page("c", 7, FeedOrigin::Following));
    controller.on_refresh().await;

    let state = controller.state();
    assert_eq!(state.posts.len(), 7);
    assert_eq!(state.cursor.offset, 7);
    assert!(!state.has_more);
    assert_eq!(ids(&state.posts)[0], "c-0");

    let last = *provider.feed_queries().last().unwrap();
    assert_eq!(last.offset, 0);
    assert!(last.refresh);
}

#[tokio::test]
async fn test_has_more_tracks_latest_page_only() {
    let (controller, provider) =
        loaded_controller(3, MockFeedProvider::page("a", 3, FeedOrigin::Own)).await;

    for (prefix, len, expected) in [("b", 2, false), ("c", 3, true), ("d", 0, false)] {
        provider.push_page(MockFeedProvider::page(prefix, len, FeedOrigin::Own));
        controller.fetch(true, false).await;
        assert_eq!(controller.state().has_more, expected, "after page {}", prefix);
    }
    assert_eq!(controller.state().posts.len(), 8);
}

#[tokio::test]
async fn test_load_more_guard_when_exhausted() {
    let (controller, provider) =
        loaded_controller(20, MockFeedProvider::page("a", 4, FeedOrigin::Own)).await;
    assert!(!controller.state().has_more);

    assert!(!controller.load_more().await);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_load_more_guard_while_loading_more() {
    let (controller, provider) =
        loaded_controller(2, MockFeedProvider::page("a", 2, FeedOrigin::Own)).await;

    provider.hold_fetches();
    provider.push_page(MockFeedProvider::page("b", 2, FeedOrigin::Own));
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.load_more().await })
    };
    settle().await;
    assert!(controller.state().loading_more);

    // A second request while the first is in flight is refused.
    assert!(!controller.load_more().await);

    provider.release_fetches();
    assert!(first.await.unwrap());
    assert_eq!(provider.feed_queries().len(), 1);
    assert_eq!(controller.state().posts.len(), 4);
    assert!(!controller.state().loading_more);
}

#[tokio::test]
async fn test_load_more_guard_during_initial_load() {
    let (controller, provider) = controller(20);
    provider.hold_fetches();
    provider.push_page(MockFeedProvider::page("a", 20, FeedOrigin::Own));

    let sign_in = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.set_user(Some(TEST_USER.to_string())).await })
    };
    settle().await;
    assert!(controller.state().loading);
    assert!(!controller.load_more().await);

    provider.release_fetches();
    sign_in.await.unwrap();
    assert_eq!(provider.feed_queries().len(), 1);
}

#[tokio::test]
async fn test_failure_keeps_posts_and_sets_error() {
    let (controller, provider) =
        loaded_controller(5, MockFeedProvider::page("a", 5, FeedOrigin::Own)).await;

    provider.push_error(FeedError::Network(NetworkError::Timeout {
        operation: "get_user_feed".to_string(),
    }));
    controller.load_more().await;

    let state = controller.state();
    assert_eq!(state.posts.len(), 5);
    assert_eq!(
        state.error.as_deref(),
        Some("The get_user_feed request timed out. Please try again.")
    );
    assert!(!state.loading_more);
    assert!(state.has_more);
    assert_eq!(state.cursor.offset, 5);
    // Posts are on screen, so the error is not a full-screen one.
    assert!(!state.has_error());

    // The next success clears it.
    controller.on_refresh().await;
    assert!(controller.state().error.is_none());
}

#[tokio::test]
async fn test_failed_first_load_is_full_screen_error() {
    let (controller, provider) = controller(20);
    provider.push_error(FeedError::Network(NetworkError::Cancelled));

    controller.set_user(Some(TEST_USER.to_string())).await;

    let state = controller.state();
    assert!(state.has_error());
    assert!(!state.loading);
    assert!(state.is_empty());
    assert!(state.feed_composition().is_none());
}

#[tokio::test]
async fn test_plain_fetch_clears_error_and_replaces() {
    let (controller, provider) =
        loaded_controller(5, MockFeedProvider::page("a", 5, FeedOrigin::Own)).await;
    provider.push_error(FeedError::Network(NetworkError::Cancelled));
    controller.on_refresh().await;
    assert!(controller.state().error.is_some());

    provider.hold_fetches();
    provider.push_page(MockFeedProvider::page("b", 1, FeedOrigin::Own));
    let fetch = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.fetch(false, false).await })
    };
    settle().await;
    let during = controller.state();
    assert!(during.loading);
    assert!(during.error.is_none());

    provider.release_fetches();
    fetch.await.unwrap();
    assert_eq!(ids(&controller.state().posts), vec!["b-0"]);
    assert_eq!(provider.feed_queries()[1].offset, 0);
}

#[tokio::test]
async fn test_analytics_cover_accumulated_posts() {
    let (controller, provider) = loaded_controller(
        2,
        vec![
            post("p1", FeedOrigin::MutualFriend, 4, false),
            post("p2", FeedOrigin::Trending, 1, false),
        ],
    )
    .await;
    provider.push_page(vec![post("p3", FeedOrigin::Competition, 9, false)]);
    controller.load_more().await;

    let composition = controller.state().feed_composition().unwrap();
    assert_eq!(composition.total, 3);
    assert_eq!(composition.mutual_friends, 1);
    assert_eq!(composition.trending, 1);
    assert_eq!(composition.competitions, 1);

    let analytics = controller.state().analytics.unwrap();
    assert_eq!(analytics.top_post.unwrap().post_id, "p3");
}

#[tokio::test]
async fn test_server_order_preserved() {
    let page = vec![
        post("z", FeedOrigin::Own, 0, false),
        post("a", FeedOrigin::Trending, 50, false),
        post("m", FeedOrigin::Following, 3, false),
    ];
    let (controller, _provider) = loaded_controller(20, page).await;
    assert_eq!(ids(&controller.state().posts), vec!["z", "a", "m"]);
}
