//! Wire rows returned by the backend and their conversion into [`Post`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::post::{Author, CompetitionRef, FeedOrigin, Post};
use super::{
    deserialize_count, deserialize_id, deserialize_lenient_f64, deserialize_string_list,
};

/// One row of the `get_user_feed` RPC. Author and competition columns are
/// flattened into the row.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub post_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub author_id: String,
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub author_full_name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
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
    pub is_liked: Option<bool>,
    #[serde(default)]
    pub feed_type: Option<FeedOrigin>,
    #[serde(default)]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub friendship_boost: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub trending_score: f64,
    #[serde(default)]
    pub competition_id: Option<String>,
    #[serde(default)]
    pub competition_title: Option<String>,
}

impl From<FeedRow> for Post {
    fn from(row: FeedRow) -> Self {
        let author = Author {
            id: row.author_id.clone(),
            username: row
                .author_username
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            avatar_url: row.author_avatar_url,
            full_name: row.author_full_name,
        };

        Post {
            id: row.post_id,
            author_id: row.author_id,
            author,
            content: row.content.unwrap_or_default(),
            images: row.images,
            tags: row.tags,
            created_at: row.created_at,
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            shares_count: row.shares_count,
            is_liked: row.is_liked.unwrap_or(false),
            feed_type: row.feed_type.unwrap_or_default(),
            relationship_type: row.relationship_type,
            friendship_boost: row.friendship_boost.unwrap_or(1.0),
            trending_score: row.trending_score,
            competition: row.competition_id.map(|id| CompetitionRef {
                id,
                title: row.competition_title,
            }),
        }
    }
}

/// A row of the plain `posts` table with the author embedded through the
/// `posts_author_id_fkey` relationship.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub author_id: String,
    #[serde(default)]
    pub users: Option<Author>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub likes_count: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub comments_count: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub shares_count: u32,
}

impl From<FallbackRow> for Post {
    fn from(row: FallbackRow) -> Self {
        let author = row
            .users
            .unwrap_or_else(|| Author::anonymous(row.author_id.clone()));
        let mut post = Post::new(row.id, row.author_id, FeedOrigin::Fallback);
        post.author = author;
        post.content = row.content.unwrap_or_default();
        post.images = row.images;
        post.tags = row.tags;
        post.created_at = row.created_at;
        post.likes_count = row.likes_count;
        post.comments_count = row.comments_count;
        post.shares_count = row.shares_count;
        post
    }
}

/// A `posts` row as delivered by a realtime change event.
///
/// Realtime payloads carry the raw table columns, so there is no author
/// join and no feed classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub author_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub images: Vec<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
