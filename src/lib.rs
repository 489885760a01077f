//! trendfeed - feed engine for a fashion-social app
//!
//! Keeps one user's ranked feed in memory: paginated loading, optimistic
//! likes and votes with revert on failure, reporting, periodic refresh,
//! recommendations and realtime notice of the user's new posts. Data comes
//! from a hosted table/RPC backend through [`traits::FeedProvider`].

pub mod adapters;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod realtime;
pub mod recommendations;
pub mod traits;
