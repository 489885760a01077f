//! Live feed updates for one user.
//!
//! Subscribes to inserts of the user's own posts and keeps the most recent
//! ones in a small buffer the UI can show as "new posts".

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::{RealtimeClient, RealtimeConfig};
use super::messages::{ChangeEvent, ChangeKind, PostgresChangeFilter};
use crate::config::BackendConfig;
use crate::models::PostRecord;
use crate::traits::{RealtimeConnection, RealtimeError};

/// Most recent inserts kept in the buffer.
pub const REALTIME_BUFFER_CAP: usize = 10;

/// Channel topic the feed joins.
pub const FEED_TOPIC: &str = "realtime:feed-updates";

const POSTS_TABLE: &str = "posts";

/// Inserts of the user's own posts, and updates of any post.
pub fn feed_filters(user_id: &str) -> Vec<PostgresChangeFilter> {
    vec![
        PostgresChangeFilter::new(ChangeKind::Insert, POSTS_TABLE)
            .with_filter(format!("author_id=eq.{}", user_id)),
        PostgresChangeFilter::new(ChangeKind::Update, POSTS_TABLE),
    ]
}

/// What the feed subscription currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealtimeSnapshot {
    /// Newest first, at most [`REALTIME_BUFFER_CAP`]
    pub updates: Vec<PostRecord>,
    /// True while the channel is subscribed
    pub connected: bool,
}

/// Fold one change into the buffer. Returns whether the buffer changed.
///
/// Inserts are prepended and the buffer truncated to the cap. Updates are
/// observed but leave the buffer alone.
pub fn apply_change(updates: &mut Vec<PostRecord>, change: &ChangeEvent) -> bool {
    if change.table != POSTS_TABLE {
        return false;
    }
    match change.kind {
        ChangeKind::Insert => match change.record_as::<PostRecord>() {
            Ok(record) => {
                debug!(post_id = %record.id, "New post received");
                updates.insert(0, record);
                updates.truncate(REALTIME_BUFFER_CAP);
                true
            }
            Err(e) => {
                warn!("Ignoring undecodable post insert: {}", e);
                false
            }
        },
        ChangeKind::Update => {
            debug!(post_id = %change.record["id"], "Post updated");
            false
        }
        ChangeKind::Delete | ChangeKind::All => false,
    }
}

/// Feed-updates subscription over any [`RealtimeConnection`].
///
/// Dropping it stops the listener task and shuts the connection down.
pub struct FeedRealtime {
    snapshot_rx: watch::Receiver<RealtimeSnapshot>,
    connection: Arc<dyn RealtimeConnection>,
    task: JoinHandle<()>,
}

impl FeedRealtime {
    /// Open a channel for `user_id` on the backend's realtime socket.
    pub async fn connect(backend: &BackendConfig, user_id: &str) -> Result<Self, RealtimeError> {
        let config =
            RealtimeConfig::from_backend(backend, FEED_TOPIC).with_filters(feed_filters(user_id));
        let client = RealtimeClient::connect(config).await?;
        info!(user_id, "Feed realtime subscription started");
        Ok(Self::attach(Arc::new(client)))
    }

    /// Start listening on an already-open connection.
    pub fn attach<C: RealtimeConnection + 'static>(connection: Arc<C>) -> Self {
        let mut changes = connection.subscribe();
        let mut status = connection.status();
        let initial = RealtimeSnapshot {
            updates: Vec::new(),
            connected: status.borrow().is_subscribed(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) => {
                            snapshot_tx.send_if_modified(|snap| apply_change(&mut snap.updates, &change));
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "Realtime listener lagged, changes dropped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let connected = status.borrow_and_update().is_subscribed();
                        snapshot_tx.send_if_modified(|snap| {
                            let modified = snap.connected != connected;
                            snap.connected = connected;
                            modified
                        });
                    }
                }
            }
            snapshot_tx.send_if_modified(|snap| std::mem::replace(&mut snap.connected, false));
            debug!("Feed realtime listener stopped");
        });

        Self {
            snapshot_rx,
            connection,
            task,
        }
    }

    pub fn snapshot(&self) -> RealtimeSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn updates(&self) -> Vec<PostRecord> {
        self.snapshot_rx.borrow().updates.clone()
    }

    pub fn connected(&self) -> bool {
        self.snapshot_rx.borrow().connected
    }

    /// Watch for snapshot changes.
    pub fn watch(&self) -> watch::Receiver<RealtimeSnapshot> {
        self.snapshot_rx.clone()
    }
}

impl Drop for FeedRealtime {
    fn drop(&mut self) {
        self.task.abort();
        self.connection.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insert(id: &str) -> ChangeEvent {
        ChangeEvent::new(
            ChangeKind::Insert,
            POSTS_TABLE,
            json!({"id": id, "author_id": "u1", "content": "fit check"}),
        )
    }

    #[test]
    fn test_feed_filters() {
        let filters = feed_filters("u1");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].event, ChangeKind::Insert);
        assert_eq!(filters[0].filter.as_deref(), Some("author_id=eq.u1"));
        assert_eq!(filters[1].event, ChangeKind::Update);
        assert!(filters[1].filter.is_none());
    }

    #[test]
    fn test_insert_prepends() {
        let mut updates = Vec::new();
        assert!(apply_change(&mut updates, &insert("p1")));
        assert!(apply_change(&mut updates, &insert("p2")));
        assert_eq!(updates[0].id, "p2");
        assert_eq!(updates[1].id, "p1");
    }

    #[test]
    fn test_buffer_is_capped_newest_first() {
        let mut updates = Vec::new();
        for i in 0..15 {
            apply_change(&mut updates, &insert(&format!("p{}", i)));
        }
        assert_eq!(updates.len(), REALTIME_BUFFER_CAP);
        assert_eq!(updates[0].id, "p14");
        assert_eq!(updates[9].id, "p5");
    }

    #[test]
    fn test_update_and_other_tables_ignored() {
        let mut updates = vec![];
        let update = ChangeEvent::new(ChangeKind::Update, POSTS_TABLE, json!({"id": "p1", "author_id": "u1"}));
        assert!(!apply_change(&mut updates, &update));
        let other = ChangeEvent::new(ChangeKind::Insert, "likes", json!({"id": "l1", "author_id": "u1"}));
        assert!(!apply_change(&mut updates, &other));
        assert!(updates.is_empty());
    }

    #[test]
    fn test_undecodable_insert_ignored() {
        let mut updates = vec![];
        let bad = ChangeEvent::new(ChangeKind::Insert, POSTS_TABLE, json!({"content": "no id"}));
        assert!(!apply_change(&mut updates, &bad));
    }
}
