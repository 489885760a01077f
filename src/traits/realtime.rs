//! Realtime channel trait abstraction.
//!
//! Provides a trait-based abstraction over a joined realtime channel,
//! enabling dependency injection and mocking in tests.

use tokio::sync::{broadcast, watch};

use crate::realtime::{ChangeEvent, ChannelStatus};

/// Realtime connection errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeError {
    /// Socket connection failed
    ConnectionFailed(String),
    /// Disconnected from server
    Disconnected,
    /// The server refused to join the channel
    JoinRejected(String),
    /// Failed to send a frame
    SendFailed(String),
    /// Failed to parse a frame
    ParseError(String),
}

impl RealtimeError {
    /// A rejected join will be rejected again; everything else may heal
    /// after a reconnect.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RealtimeError::JoinRejected(_) | RealtimeError::ParseError(_))
    }
}

impl std::fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RealtimeError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RealtimeError::Disconnected => write!(f, "Disconnected from server"),
            RealtimeError::JoinRejected(msg) => write!(f, "Channel join rejected: {}", msg),
            RealtimeError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            RealtimeError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for RealtimeError {}

/// A joined realtime channel delivering table change events.
///
/// # Example
///
/// ```ignore
/// use trendfeed::traits::RealtimeConnection;
///
/// fn watch_changes<C: RealtimeConnection>(conn: &C) {
///     let mut changes = conn.subscribe();
///     let status = conn.status();
///     // ...
///     conn.shutdown();
/// }
/// ```
pub trait RealtimeConnection: Send + Sync {
    /// Subscribe to change events. Every receiver gets every event.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Current channel status, updated as the channel joins, drops and
    /// rejoins.
    fn status(&self) -> watch::Receiver<ChannelStatus>;

    /// Leave the channel and close the socket.
    fn shutdown(&self);
}
