use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

/// Topic heartbeats are sent on.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// One frame of the channel protocol, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    /// Join `topic`, asking for the given table changes.
    pub fn join(
        topic: &str,
        filters: &[PostgresChangeFilter],
        access_token: Option<&str>,
        msg_ref: &str,
    ) -> Self {
        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": filters,
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }
        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload,
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn leave(topic: &str, msg_ref: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn heartbeat(msg_ref: &str) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    /// Classify an incoming frame relative to the channel we joined.
    pub fn classify(&self, topic: &str, join_ref: &str) -> ChannelEvent {
        match self.event.as_str() {
            EVENT_REPLY if self.topic == PHOENIX_TOPIC => ChannelEvent::HeartbeatAck,
            EVENT_REPLY if self.topic == topic && self.msg_ref.as_deref() == Some(join_ref) => {
                if self.payload["status"] == "ok" {
                    ChannelEvent::Joined
                } else {
                    let reason = self.payload["response"]["reason"]
                        .as_str()
                        .or_else(|| self.payload["status"].as_str())
                        .unwrap_or("unknown")
                        .to_string();
                    ChannelEvent::JoinRejected(reason)
                }
            }
            EVENT_POSTGRES_CHANGES if self.topic == topic => {
                match serde_json::from_value::<ChangeEvent>(self.payload["data"].clone()) {
                    Ok(change) => ChannelEvent::Change(change),
                    Err(e) => ChannelEvent::Malformed(e.to_string()),
                }
            }
            EVENT_CLOSE if self.topic == topic => ChannelEvent::Closed,
            EVENT_ERROR if self.topic == topic => {
                ChannelEvent::Error(self.payload.to_string())
            }
            _ => ChannelEvent::Other,
        }
    }
}

/// What an incoming frame means for the joined channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Joined,
    JoinRejected(String),
    Change(ChangeEvent),
    /// Server closed the channel
    Closed,
    /// Channel crashed server-side
    Error(String),
    HeartbeatAck,
    /// A change frame whose data could not be decoded
    Malformed(String),
    /// Presence, system notices and frames for other topics
    Other,
}

/// Row-level change kinds. `All` is only meaningful in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "*")]
    All,
}

/// One `postgres_changes` subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresChangeFilter {
    pub event: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl PostgresChangeFilter {
    /// Filter on a table of the `public` schema.
    pub fn new(event: ChangeKind, table: impl Into<String>) -> Self {
        Self {
            event,
            schema: "public".to_string(),
            table: table.into(),
            filter: None,
        }
    }

    /// Row filter such as `author_id=eq.<id>`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// A committed row change delivered on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Value,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, table: impl Into<String>, record: Value) -> Self {
        Self {
            kind,
            schema: "public".to_string(),
            table: table.into(),
            record,
            old_record: Value::Null,
            commit_timestamp: None,
        }
    }

    /// Decode the new row image.
    pub fn record_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.record)
    }
}
