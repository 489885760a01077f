//! Wiremock helpers for testing the provider over real HTTP.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trendfeed::config::BackendConfig;

pub const ANON_KEY: &str = "test-anon-key";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// Backend configuration pointing at the mock server.
pub fn backend_for(server: &MockServer) -> BackendConfig {
    BackendConfig::new(server.uri(), ANON_KEY)
        .unwrap()
        .with_access_token(ACCESS_TOKEN)
}

/// A `get_user_feed` row.
pub fn feed_row(id: &str, feed_type: &str) -> Value {
    json!({
        "post_id": id,
        "author_id": "author-1",
        "author_username": "mila",
        "content": "linen set",
        "images": ["https://cdn.example/1.jpg"],
        "created_at": "2026-10-01T12:00:00Z",
        "likes_count": 2,
        "comments_count": 1,
        "shares_count": 0,
        "is_liked": false,
        "feed_type": feed_type,
        "friendship_boost": 1.5,
        "trending_score": "3.5"
    })
}

/// Mount a JSON response for `POST /rest/v1/rpc/<function>`.
pub async fn mount_rpc(server: &MockServer, function: &str, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/rest/v1/rpc/{}", function)))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}
