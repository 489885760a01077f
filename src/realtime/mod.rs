//! Realtime channel client for table change notifications.
//!
//! The backend pushes committed row changes over a Phoenix-protocol
//! websocket. [`RealtimeClient`] joins one channel and keeps it joined
//! across drops; [`FeedRealtime`] folds the post inserts it delivers into
//! a short "new posts" buffer.

pub mod client;
pub mod feed;
pub mod messages;

pub use client::{ChannelStatus, RealtimeClient, RealtimeConfig};
pub use feed::{
    apply_change, feed_filters, FeedRealtime, RealtimeSnapshot, FEED_TOPIC, REALTIME_BUFFER_CAP,
};
pub use messages::{ChangeEvent, ChangeKind, ChannelEvent, PhoenixMessage, PostgresChangeFilter};
