//! Mock realtime connection for testing.
//!
//! Lets tests inject change events and drive the channel status without a
//! socket.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};

use crate::realtime::{ChangeEvent, ChangeKind, ChannelStatus};
use crate::traits::RealtimeConnection;

/// Mock realtime connection.
///
/// # Example
///
/// ```ignore
/// use trendfeed::adapters::mock::MockRealtime;
/// use trendfeed::realtime::FeedRealtime;
///
/// let mock = Arc::new(MockRealtime::subscribed());
/// let feed = FeedRealtime::attach(mock.clone());
/// mock.emit_insert("posts", serde_json::json!({"id": "p1", "author_id": "u1"}));
/// ```
pub struct MockRealtime {
    changes_tx: broadcast::Sender<ChangeEvent>,
    status_tx: watch::Sender<ChannelStatus>,
    shutdown_called: AtomicBool,
}

impl MockRealtime {
    /// A connection still waiting for its join ack.
    pub fn new() -> Self {
        Self::with_status(ChannelStatus::Joining)
    }

    pub fn subscribed() -> Self {
        Self::with_status(ChannelStatus::Subscribed)
    }

    fn with_status(status: ChannelStatus) -> Self {
        let (changes_tx, _) = broadcast::channel(100);
        let (status_tx, _) = watch::channel(status);
        Self {
            changes_tx,
            status_tx,
            shutdown_called: AtomicBool::new(false),
        }
    }

    /// Deliver a change to every subscriber. Returns the receiver count.
    pub fn emit(&self, change: ChangeEvent) -> usize {
        self.changes_tx.send(change).unwrap_or(0)
    }

    pub fn emit_insert(&self, table: &str, record: serde_json::Value) -> usize {
        self.emit(ChangeEvent::new(ChangeKind::Insert, table, record))
    }

    pub fn set_status(&self, status: ChannelStatus) {
        self.status_tx.send_replace(status);
    }

    pub fn was_shut_down(&self) -> bool {
        self.shutdown_called.load(Ordering::SeqCst)
    }
}

impl Default for MockRealtime {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeConnection for MockRealtime {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes_tx.subscribe()
    }

    fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    fn shutdown(&self) {
        self.shutdown_called.store(true, Ordering::SeqCst);
        self.status_tx.send_replace(ChannelStatus::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let mock = MockRealtime::new();
        let mut rx = mock.subscribe();

        assert_eq!(mock.emit_insert("posts", json!({"id": "p1"})), 1);
        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.record["id"], "p1");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let mock = MockRealtime::new();
        assert_eq!(mock.emit_insert("posts", json!({})), 0);
    }

    #[test]
    fn test_status_and_shutdown() {
        let mock = MockRealtime::new();
        let status = mock.status();
        assert_eq!(*status.borrow(), ChannelStatus::Joining);

        mock.set_status(ChannelStatus::Subscribed);
        assert!(status.borrow().is_subscribed());

        mock.shutdown();
        assert!(mock.was_shut_down());
        assert_eq!(*status.borrow(), ChannelStatus::Closed);
    }
}
