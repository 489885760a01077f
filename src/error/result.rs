//! Result type alias for feed operations.

use super::feed_error::FeedError;

/// Type alias for Results using FeedError.
///
/// # Example
///
/// ```ignore
/// use trendfeed::error::FeedResult;
///
/// async fn first_page(provider: &impl FeedProvider) -> FeedResult<Vec<Post>> {
///     provider.get_feed("user-1", FeedQuery::first_page(20)).await
/// }
/// ```
pub type FeedResult<T> = Result<T, FeedError>;
