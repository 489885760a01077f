use serde::{Deserialize, Serialize};

use super::post::{FeedOrigin, Post};

/// The highest-engagement post of a feed snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopPost {
    pub post_id: String,
    pub engagement: u64,
}

/// Per-origin counts over a post collection. Derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedAnalytics {
    pub total_posts: usize,
    pub mutual_friends_posts: usize,
    pub following_posts: usize,
    pub own_posts: usize,
    pub trending_posts: usize,
    pub competition_posts: usize,
    pub average_engagement: f64,
    pub top_post: Option<TopPost>,
}

impl FeedAnalytics {
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut analytics = FeedAnalytics {
            total_posts: posts.len(),
            ..Default::default()
        };

        let mut total_engagement = 0u64;
        for post in posts {
            match post.feed_type {
                FeedOrigin::MutualFriend => analytics.mutual_friends_posts += 1,
                FeedOrigin::Following => analytics.following_posts += 1,
                FeedOrigin::Own => analytics.own_posts += 1,
                FeedOrigin::Trending => analytics.trending_posts += 1,
                FeedOrigin::Competition => analytics.competition_posts += 1,
                FeedOrigin::Fallback | FeedOrigin::Unknown => {}
            }

            let engagement = post.engagement();
            total_engagement += engagement;

            // Strictly greater: the first post wins ties, zero never wins.
            let best = analytics.top_post.as_ref().map_or(0, |top| top.engagement);
            if engagement > best {
                analytics.top_post = Some(TopPost {
                    post_id: post.id.clone(),
                    engagement,
                });
            }
        }

        if !posts.is_empty() {
            analytics.average_engagement = total_engagement as f64 / posts.len() as f64;
        }

        analytics
    }

    pub fn composition(&self) -> FeedComposition {
        FeedComposition {
            mutual_friends: self.mutual_friends_posts,
            following: self.following_posts,
            own: self.own_posts,
            trending: self.trending_posts,
            competitions: self.competition_posts,
            total: self.total_posts,
        }
    }
}

/// Display-facing view of [`FeedAnalytics`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FeedComposition {
    pub mutual_friends: usize,
    pub following: usize,
    pub own: usize,
    pub trending: usize,
    pub competitions: usize,
    pub total: usize,
}
