//! Prelude module for convenient imports.
//!
//! ```ignore
//! use trendfeed::prelude::*;
//! ```

// Configuration
pub use crate::config::{BackendConfig, FeedOptions};

// Errors
pub use crate::error::{ErrorCategory, FeedError, FeedResult};

// Model types
pub use crate::models::{Author, FeedAnalytics, FeedComposition, FeedOrigin, Post, PostRecord};

// Feed controller
pub use crate::feed::{FeedController, FeedState, ReportOutcome, DEFAULT_VOTE_SCORE};

// Recommendations
pub use crate::recommendations::{Recommendations, RecommendationsState};

// Realtime
pub use crate::realtime::{ChannelStatus, FeedRealtime, RealtimeSnapshot};

// Providers and adapters
pub use crate::adapters::ReqwestHttpClient;
pub use crate::provider::SupabaseFeedProvider;
pub use crate::traits::{FeedProvider, FeedQuery, HttpClient, RealtimeConnection};
