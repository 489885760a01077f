//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST, DELETE)
//! - [`FeedProvider`] - Feed pages, engagement mutations, recommendations
//! - [`RealtimeConnection`] - A joined realtime channel

pub mod feed;
pub mod http;
pub mod realtime;

pub use feed::{FeedProvider, FeedQuery};
pub use http::{Headers, HttpClient, HttpError, Response};
pub use realtime::{RealtimeConnection, RealtimeError};
