//! Feed retrieval, pagination and optimistic engagement.
//!
//! [`FeedController`] owns the state a feed screen renders from and the
//! actions it triggers. It talks to the backend only through a
//! [`crate::traits::FeedProvider`].

pub mod auto_refresh;
pub mod controller;
pub mod cursor;
pub mod optimistic;
pub mod state;

pub use auto_refresh::AutoRefresh;
pub use controller::{FeedController, ReportOutcome, DEFAULT_VOTE_SCORE};
pub use cursor::PaginationCursor;
pub use optimistic::{Engagement, EngagementPatch, OptimisticUpdate};
pub use state::{FeedState, FALLBACK_FETCH_ERROR};
