//! Unified error handling for the feed engine.
//!
//! This module provides:
//!
//! - **Error Categories**: High-level classification for handling decisions
//! - **Domain-specific Errors**: Network and Backend errors
//! - **Unified Error Type**: `FeedError` consolidates all error types
//! - **Result Type Alias**: `FeedResult<T>` for consistent return types
//!
//! # Error Categories
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, DNS, timeout | Yes |
//! | Auth | Expired session, row-level security | No |
//! | Server | Backend errors (5xx) | Yes |
//! | Client | Bad request, unexpected payload | No |
//! | Configuration | Missing URL or key | No |
//!
//! None of these are fatal to the feed: a failed fetch keeps the posts
//! already on screen and a failed mutation is reverted locally.

mod backend;
mod category;
mod feed_error;
mod network;
mod result;

pub use backend::BackendError;
pub use category::ErrorCategory;
pub use feed_error::FeedError;
pub use network::{classify_http_error, NetworkError};
pub use result::FeedResult;
