use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_count, deserialize_id, deserialize_nullable_string};

/// Why a post shows up in the user's feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedOrigin {
    /// Authored by the current user
    Own,
    /// Authored by someone the user follows
    Following,
    /// Authored by a mutual friend
    MutualFriend,
    /// Surfaced by the trending score
    Trending,
    /// A competition entry open for votes
    Competition,
    /// Served by the plain public-posts query after the ranked feed failed
    Fallback,
    /// Any classification this client does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl FeedOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedOrigin::Own => "own",
            FeedOrigin::Following => "following",
            FeedOrigin::MutualFriend => "mutual_friend",
            FeedOrigin::Trending => "trending",
            FeedOrigin::Competition => "competition",
            FeedOrigin::Fallback => "fallback",
            FeedOrigin::Unknown => "unknown",
        }
    }
}

/// Public profile fields embedded in a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Author {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Author {
    /// Placeholder used when the author row could not be joined.
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: "Anonymous".to_string(),
            avatar_url: None,
            full_name: None,
        }
    }
}

/// Competition a post was entered into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitionRef {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// A feed item as held by the client.
///
/// Posts are created server-side; the client only reads them, appends
/// pages of them and patches the engagement fields locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub author_id: String,
    pub author: Author,
    /// Caption / outfit description
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub content: String,
    /// Media URLs in display order
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub likes_count: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub comments_count: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub shares_count: u32,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub feed_type: FeedOrigin,
    #[serde(default)]
    pub relationship_type: Option<String>,
    #[serde(default = "default_boost")]
    pub friendship_boost: f64,
    #[serde(default)]
    pub trending_score: f64,
    #[serde(default)]
    pub competition: Option<CompetitionRef>,
}

fn default_boost() -> f64 {
    1.0
}

impl Post {
    /// Minimal post, mostly useful for fixtures and realtime inserts.
    pub fn new(id: impl Into<String>, author_id: impl Into<String>, origin: FeedOrigin) -> Self {
        let author_id = author_id.into();
        Self {
            id: id.into(),
            author: Author::anonymous(author_id.clone()),
            author_id,
            content: String::new(),
            images: Vec::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            is_liked: false,
            feed_type: origin,
            relationship_type: None,
            friendship_boost: default_boost(),
            trending_score: 0.0,
            competition: None,
        }
    }

    pub fn with_likes(mut self, likes_count: u32, is_liked: bool) -> Self {
        self.likes_count = likes_count;
        self.is_liked = is_liked;
        self
    }

    /// Likes + comments + shares.
    pub fn engagement(&self) -> u64 {
        u64::from(self.likes_count) + u64::from(self.comments_count) + u64::from(self.shares_count)
    }

    /// Engagement per hour since the post was created.
    ///
    /// A post stamped in the future (clock skew) or exactly `now` reports its
    /// raw engagement.
    pub fn engagement_rate(&self, now: DateTime<Utc>) -> f64 {
        let hours = (now - self.created_at).num_milliseconds() as f64 / 3_600_000.0;
        let engagement = self.engagement() as f64;
        if hours <= 0.0 {
            engagement
        } else {
            engagement / hours
        }
    }

    /// Short relative timestamp for list rows.
    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        let minutes = (now - self.created_at).num_minutes();
        if minutes < 1 {
            return "Just now".to_string();
        }
        if minutes < 60 {
            return format!("{}m ago", minutes);
        }
        let hours = minutes / 60;
        if hours < 24 {
            return format!("{}h ago", hours);
        }
        let days = hours / 24;
        if days < 7 {
            return format!("{}d ago", days);
        }
        self.created_at.format("%Y-%m-%d").to_string()
    }

    pub fn is_own_post(&self) -> bool {
        self.feed_type == FeedOrigin::Own
    }

    pub fn is_following(&self) -> bool {
        self.feed_type == FeedOrigin::Following
    }

    pub fn is_mutual_friend(&self) -> bool {
        self.feed_type == FeedOrigin::MutualFriend
    }

    pub fn is_trending(&self) -> bool {
        self.feed_type == FeedOrigin::Trending
    }

    pub fn is_competition_entry(&self) -> bool {
        self.feed_type == FeedOrigin::Competition
    }
}
