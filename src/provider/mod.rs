//! Feed providers backed by the hosted backend.
//!
//! [`SupabaseFeedProvider`] implements [`crate::traits::FeedProvider`] over
//! the table API and RPC functions, with a per-user page cache in front.

pub mod cache;
pub mod supabase;

pub use cache::FeedCache;
pub use supabase::{SupabaseFeedProvider, PRELOAD_FEED_LIMIT, PRELOAD_RECOMMENDATION_LIMIT};
