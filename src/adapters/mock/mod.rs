//! Mock implementations for testing.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses
//! - [`MockFeedProvider`] - Feed provider with queued pages and recorded calls
//! - [`MockRealtime`] - Realtime connection with change injection

pub mod feed;
pub mod http;
pub mod realtime;

pub use feed::{MockFeedProvider, ProviderCall};
pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use realtime::MockRealtime;
