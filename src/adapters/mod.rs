//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//!
//! The realtime socket adapter lives in [`crate::realtime`] since it owns
//! its protocol loop.
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::MockFeedProvider`] - Scripted feed pages
//! - [`mock::MockRealtime`] - Change event injection

pub mod mock;
pub mod reqwest_http;

pub use mock::{MockFeedProvider, MockHttpClient, MockRealtime};
pub use reqwest_http::ReqwestHttpClient;
