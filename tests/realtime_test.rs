//! Realtime feed updates, over the mock connection and over a local
//! websocket server speaking the channel protocol.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use common::*;
use trendfeed::adapters::mock::MockRealtime;
use trendfeed::realtime::{
    feed_filters, ChannelStatus, FeedRealtime, PhoenixMessage, RealtimeClient, RealtimeConfig,
    FEED_TOPIC, REALTIME_BUFFER_CAP,
};
use trendfeed::traits::RealtimeConnection;

const WAIT: Duration = Duration::from_secs(5);

fn post_record(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "author_id": TEST_USER,
        "content": "new drop",
        "images": ["https://cdn.example/a.jpg"],
        "visibility": "public",
        "created_at": "2026-10-03T09:30:00Z"
    })
}

#[tokio::test]
async fn test_mock_inserts_fill_buffer_newest_first() {
    let mock = Arc::new(MockRealtime::subscribed());
    let feed = FeedRealtime::attach(mock.clone());
    let mut rx = feed.watch();
    assert!(feed.connected());

    for i in 0..12 {
        mock.emit_insert("posts", post_record(&format!("p{}", i)));
    }
    tokio::time::timeout(WAIT, rx.wait_for(|snap| snap.updates.first().map(|p| p.id.as_str()) == Some("p11")))
        .await
        .unwrap()
        .unwrap();

    let updates = feed.updates();
    assert_eq!(updates.len(), REALTIME_BUFFER_CAP);
    assert_eq!(updates[0].id, "p11");
    assert_eq!(updates[REALTIME_BUFFER_CAP - 1].id, "p2");
    assert_eq!(updates[0].content.as_deref(), Some("new drop"));
}

#[tokio::test]
async fn test_mock_status_drives_connected_flag() {
    let mock = Arc::new(MockRealtime::new());
    let feed = FeedRealtime::attach(mock.clone());
    let mut rx = feed.watch();
    assert!(!feed.connected());

    mock.set_status(ChannelStatus::Subscribed);
    tokio::time::timeout(WAIT, rx.wait_for(|snap| snap.connected))
        .await
        .unwrap()
        .unwrap();

    mock.set_status(ChannelStatus::Reconnecting { attempt: 1 });
    tokio::time::timeout(WAIT, rx.wait_for(|snap| !snap.connected))
        .await
        .unwrap()
        .unwrap();
    assert!(feed.updates().is_empty());
}

#[tokio::test]
async fn test_drop_shuts_connection_down() {
    let mock = Arc::new(MockRealtime::subscribed());
    let feed = FeedRealtime::attach(mock.clone());
    assert!(!mock.was_shut_down());

    drop(feed);
    assert!(mock.was_shut_down());
}

type ServerSocket = WebSocketStream<TcpStream>;

async fn next_frame(ws: &mut ServerSocket) -> Option<PhoenixMessage> {
    while let Some(msg) = ws.next().await {
        if let Ok(Message::Text(text)) = msg {
            return Some(serde_json::from_str(&text).unwrap());
        }
    }
    None
}

async fn reply(ws: &mut ServerSocket, frame: serde_json::Value) {
    ws.send(Message::Text(frame.to_string())).await.unwrap();
}

/// Accept one client, ack its join, push one insert and report the join and
/// leave frames it sent.
async fn spawn_channel_server(
    join_status: &'static str,
) -> (String, oneshot::Receiver<(PhoenixMessage, Option<PhoenixMessage>)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/realtime/v1/websocket", listener.local_addr().unwrap());
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let join = next_frame(&mut ws).await.unwrap();
        let join_ref = join.msg_ref.clone();
        reply(
            &mut ws,
            json!({
                "topic": FEED_TOPIC,
                "event": "phx_reply",
                "payload": {"status": join_status, "response": {"reason": "unauthorized"}},
                "ref": join_ref,
            }),
        )
        .await;

        if join_status == "ok" {
            reply(
                &mut ws,
                json!({
                    "topic": FEED_TOPIC,
                    "event": "postgres_changes",
                    "payload": {"data": {
                        "type": "INSERT",
                        "schema": "public",
                        "table": "posts",
                        "record": post_record("live-1"),
                        "commit_timestamp": "2026-10-03T09:30:00Z"
                    }},
                    "ref": null,
                }),
            )
            .await;
        }

        let mut leave = None;
        while let Some(frame) = next_frame(&mut ws).await {
            if frame.event == "phx_leave" {
                leave = Some(frame);
                break;
            }
        }
        let _ = done_tx.send((join, leave));
    });

    (url, done_rx)
}

#[tokio::test]
async fn test_client_joins_and_delivers_inserts() {
    let (url, done) = spawn_channel_server("ok").await;
    let config = RealtimeConfig::new(url, FEED_TOPIC).with_filters(feed_filters(TEST_USER));
    let client = RealtimeClient::connect(config).await.unwrap();

    let feed = FeedRealtime::attach(Arc::new(client));
    let mut rx = feed.watch();
    tokio::time::timeout(WAIT, rx.wait_for(|snap| snap.connected && !snap.updates.is_empty()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(feed.updates()[0].id, "live-1");

    drop(feed);
    let (join, leave) = tokio::time::timeout(WAIT, done).await.unwrap().unwrap();

    assert_eq!(join.topic, FEED_TOPIC);
    assert_eq!(join.event, "phx_join");
    let changes = &join.payload["config"]["postgres_changes"];
    assert_eq!(changes[0]["event"], "INSERT");
    assert_eq!(changes[0]["filter"], format!("author_id=eq.{}", TEST_USER));
    assert_eq!(changes[1]["event"], "UPDATE");

    let leave = leave.expect("leave frame on shutdown");
    assert_eq!(leave.topic, FEED_TOPIC);
}

#[tokio::test]
async fn test_rejected_join_closes_channel() {
    let (url, done) = spawn_channel_server("error").await;
    let client = RealtimeClient::connect(RealtimeConfig::new(url, FEED_TOPIC))
        .await
        .unwrap();
    let mut status = client.status();

    tokio::time::timeout(WAIT, status.wait_for(|s| *s == ChannelStatus::Closed))
        .await
        .unwrap()
        .unwrap();

    let (_, leave) = tokio::time::timeout(WAIT, done).await.unwrap().unwrap();
    assert!(leave.is_none());
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = RealtimeConfig::new(format!("ws://{}/socket", addr), FEED_TOPIC);
    assert!(RealtimeClient::connect(config).await.is_err());
}
