use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, watch, Notify};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::messages::{ChangeEvent, ChannelEvent, PhoenixMessage, PostgresChangeFilter};
use crate::config::BackendConfig;
use crate::traits::{RealtimeConnection, RealtimeError};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Channel state as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelStatus {
    /// Join sent, waiting for the server's ack
    Joining,
    Subscribed,
    Reconnecting { attempt: u8 },
    /// Shut down, rejected, or out of reconnect attempts
    Closed,
}

impl ChannelStatus {
    pub fn is_subscribed(&self) -> bool {
        matches!(self, ChannelStatus::Subscribed)
    }
}

/// Configuration for [`RealtimeClient`].
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Socket URL including `apikey` and `vsn` query parameters
    pub url: String,
    /// Channel topic, e.g. `realtime:feed-updates`
    pub topic: String,
    pub filters: Vec<PostgresChangeFilter>,
    pub access_token: Option<String>,
    pub max_retries: u8,
    pub max_backoff_secs: u64,
    pub heartbeat_interval: Duration,
}

impl RealtimeConfig {
    pub fn new(url: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            topic: topic.into(),
            filters: Vec::new(),
            access_token: None,
            max_retries: 5,
            max_backoff_secs: 30,
            heartbeat_interval: Duration::from_secs(30),
        }
    }

    /// Socket URL and access token taken from the backend configuration.
    pub fn from_backend(backend: &BackendConfig, topic: impl Into<String>) -> Self {
        let mut config = Self::new(backend.realtime_url(), topic);
        config.access_token = backend.access_token.clone();
        config
    }

    pub fn with_filters(mut self, filters: Vec<PostgresChangeFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_max_backoff_secs(mut self, secs: u64) -> Self {
        self.max_backoff_secs = secs;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Delay before reconnect `attempt` (1-based): 1s, 2s, 4s, ... capped.
    pub fn backoff(&self, attempt: u8) -> Duration {
        let exp = u32::from(attempt.saturating_sub(1)).min(63);
        let secs = 1u64.checked_shl(exp).unwrap_or(u64::MAX);
        Duration::from_secs(secs.min(self.max_backoff_secs))
    }
}

/// Monotonic message refs shared by joins and heartbeats.
#[derive(Debug, Default)]
struct RefCounter(AtomicU64);

impl RefCounter {
    fn next(&self) -> String {
        (self.0.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

/// Client for one realtime channel with automatic rejoin.
pub struct RealtimeClient {
    changes_tx: broadcast::Sender<ChangeEvent>,
    status_rx: watch::Receiver<ChannelStatus>,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl RealtimeClient {
    /// Open the socket and send the join. Fails only if the first
    /// connection attempt fails; later drops are retried in the background.
    pub async fn connect(config: RealtimeConfig) -> Result<Self, RealtimeError> {
        let (ws_sink, ws_source) = open(&config.url).await?;
        info!(topic = %config.topic, "Connected to realtime socket");

        let (changes_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Joining);
        let shutdown = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let channel = ChannelLoop {
            config,
            refs: RefCounter::default(),
            changes_tx: changes_tx.clone(),
            status_tx,
            shutdown: shutdown.clone(),
            wake: wake.clone(),
        };
        tokio::spawn(channel.run(ws_sink, ws_source));

        Ok(Self {
            changes_tx,
            status_rx,
            shutdown,
            wake,
        })
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.status_rx.borrow().clone()
    }
}

impl RealtimeConnection for RealtimeClient {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes_tx.subscribe()
    }

    fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.status_rx.clone()
    }

    fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            info!("Shutting down realtime client");
            self.wake.notify_one();
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn open(url: &str) -> Result<(WsSink, WsSource), RealtimeError> {
    let (stream, _) = connect_async(url)
        .await
        .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;
    Ok(stream.split())
}

async fn send_frame(sink: &mut WsSink, frame: &PhoenixMessage) -> Result<(), RealtimeError> {
    let json =
        serde_json::to_string(frame).map_err(|e| RealtimeError::SendFailed(e.to_string()))?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| RealtimeError::SendFailed(e.to_string()))
}

/// What the loop does after handling one frame.
enum Flow {
    Continue,
    Reconnect,
    Stop,
}

struct ChannelLoop {
    config: RealtimeConfig,
    refs: RefCounter,
    changes_tx: broadcast::Sender<ChangeEvent>,
    status_tx: watch::Sender<ChannelStatus>,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ChannelLoop {
    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: ChannelStatus) {
        let _ = self.status_tx.send(status);
    }

    async fn join(&self, sink: &mut WsSink) -> Result<String, RealtimeError> {
        let join_ref = self.refs.next();
        let frame = PhoenixMessage::join(
            &self.config.topic,
            &self.config.filters,
            self.config.access_token.as_deref(),
            &join_ref,
        );
        self.set_status(ChannelStatus::Joining);
        send_frame(sink, &frame).await?;
        debug!(topic = %self.config.topic, join_ref = %join_ref, "Join sent");
        Ok(join_ref)
    }

    async fn run(self, mut ws_sink: WsSink, mut ws_source: WsSource) {
        let mut join_ref = match self.join(&mut ws_sink).await {
            Ok(join_ref) => join_ref,
            Err(e) => {
                warn!("Initial join failed: {}", e);
                String::new()
            }
        };

        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.stopping() {
                break;
            }

            let flow = tokio::select! {
                _ = self.wake.notified() => Flow::Stop,
                _ = heartbeat.tick() => {
                    match send_frame(&mut ws_sink, &PhoenixMessage::heartbeat(&self.refs.next())).await {
                        Ok(()) => Flow::Continue,
                        Err(e) => {
                            warn!("Heartbeat failed: {}", e);
                            Flow::Reconnect
                        }
                    }
                }
                msg = ws_source.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text, &join_ref),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                        Flow::Continue
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Received close frame from server");
                        Flow::Reconnect
                    }
                    Some(Ok(_)) => Flow::Continue,
                    Some(Err(e)) => {
                        error!("Realtime socket error: {}", e);
                        Flow::Reconnect
                    }
                    None => {
                        info!("Realtime stream ended");
                        Flow::Reconnect
                    }
                },
            };

            match flow {
                Flow::Continue => {}
                Flow::Stop => break,
                Flow::Reconnect => {
                    let Some((sink, source)) = self.reconnect().await else {
                        break;
                    };
                    ws_sink = sink;
                    ws_source = source;
                    match self.join(&mut ws_sink).await {
                        Ok(new_ref) => join_ref = new_ref,
                        Err(e) => warn!("Rejoin failed: {}", e),
                    }
                    heartbeat.reset();
                }
            }
        }

        if self.stopping() {
            let leave = PhoenixMessage::leave(&self.config.topic, &self.refs.next());
            let _ = send_frame(&mut ws_sink, &leave).await;
        }
        let _ = ws_sink.close().await;
        info!(topic = %self.config.topic, "Realtime channel closed");
        self.set_status(ChannelStatus::Closed);
    }

    fn handle_text(&self, text: &str, join_ref: &str) -> Flow {
        let frame = match serde_json::from_str::<PhoenixMessage>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to parse realtime frame: {} - {}", e, text);
                return Flow::Continue;
            }
        };

        match frame.classify(&self.config.topic, join_ref) {
            ChannelEvent::Joined => {
                info!(topic = %self.config.topic, "Realtime channel subscribed");
                self.set_status(ChannelStatus::Subscribed);
                Flow::Continue
            }
            ChannelEvent::JoinRejected(reason) => {
                error!(topic = %self.config.topic, "Channel join rejected: {}", reason);
                Flow::Stop
            }
            ChannelEvent::Change(change) => {
                debug!(kind = ?change.kind, table = %change.table, "Realtime change");
                // No receivers is fine; changes are only interesting live.
                let _ = self.changes_tx.send(change);
                Flow::Continue
            }
            ChannelEvent::Closed => {
                info!("Server closed the channel");
                Flow::Reconnect
            }
            ChannelEvent::Error(detail) => {
                warn!("Channel error: {}", detail);
                Flow::Reconnect
            }
            ChannelEvent::Malformed(e) => {
                warn!("Skipping malformed change: {}", e);
                Flow::Continue
            }
            ChannelEvent::HeartbeatAck | ChannelEvent::Other => Flow::Continue,
        }
    }

    /// Reconnect with exponential backoff. `None` when out of attempts or
    /// shutting down.
    async fn reconnect(&self) -> Option<(WsSink, WsSource)> {
        for attempt in 1..=self.config.max_retries {
            if self.stopping() {
                debug!("Shutdown requested during reconnection");
                return None;
            }

            self.set_status(ChannelStatus::Reconnecting { attempt });
            let backoff = self.config.backoff(attempt);
            info!(
                "Reconnection attempt {} of {}, waiting {}s",
                attempt,
                self.config.max_retries,
                backoff.as_secs()
            );

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = self.wake.notified() => {
                    debug!("Shutdown requested during backoff");
                    return None;
                }
            }

            match open(&self.config.url).await {
                Ok(pair) => {
                    info!("Reconnected successfully on attempt {}", attempt);
                    return Some(pair);
                }
                Err(e) => warn!("Reconnection attempt {} failed: {}", attempt, e),
            }
        }

        error!(
            "Failed to reconnect after {} attempts, giving up",
            self.config.max_retries
        );
        None
    }
}
