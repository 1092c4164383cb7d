//! Wire protocol shared by the remote store service and its clients.
//!
//! WebSocket messages are JSON-encoded and use snake_case tags. HTTP bodies
//! use camelCase fields like the rest of the engine types.

use crate::{NewRow, RemoteRow, RowId, SubmitOutcome};
use serde::{Deserialize, Serialize};

/// The one collection the service holds.
pub const SCORES_COLLECTION: &str = "scores";

/// Sort key for ordered reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderKey {
    /// Highest score first
    #[default]
    Score,
    /// Newest first
    Timestamp,
}

impl OrderKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKey::Score => "score",
            OrderKey::Timestamp => "timestamp",
        }
    }

    /// Sort rows in place; stable, so equal keys keep storage order.
    pub fn sort(&self, rows: &mut [RemoteRow]) {
        match self {
            OrderKey::Score => rows.sort_by(|a, b| b.score.cmp(&a.score)),
            OrderKey::Timestamp => rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }
    }
}

/// Query string for `GET /collections/{collection}/rows`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderKey>,
}

/// Body of `POST /collections/{collection}/rows` and `.../best`.
pub type CreateRowRequest = NewRow;

/// Response to a row creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRowResponse {
    pub row_id: RowId,
}

/// Response to an atomic best-score write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestWrite {
    /// What the write did to the player's best
    pub outcome: SubmitOutcome,
    /// The row now holding the best, if one was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<RowId>,
    /// Rows removed as part of the write
    #[serde(default)]
    pub removed: Vec<RowId>,
}

/// Error body returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving snapshots of a collection.
    Subscribe {
        collection: String,
        /// Only deliver the current snapshot, then stop
        #[serde(default)]
        once: bool,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once when the socket opens; doubles as the connectivity signal.
    Connected,

    /// Full contents of a collection after a change.
    Snapshot {
        collection: String,
        rows: Vec<RemoteRow>,
    },

    /// Response to a ping.
    Pong,

    /// Error message.
    Error { message: String },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Create a snapshot message.
    pub fn snapshot(collection: impl Into<String>, rows: Vec<RemoteRow>) -> Self {
        ServerMessage::Snapshot {
            collection: collection.into(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_message_format() {
        let msg = ClientMessage::Subscribe {
            collection: SCORES_COLLECTION.to_string(),
            once: true,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "subscribe", "collection": "scores", "once": true})
        );
    }

    #[test]
    fn subscribe_once_defaults_to_false() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","collection":"scores"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                collection: "scores".to_string(),
                once: false
            }
        );
    }

    #[test]
    fn snapshot_message_roundtrip() {
        let msg = ServerMessage::snapshot("scores", vec![RemoteRow::new("1", "Alex", 150, 0)]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"snapshot""#));
        let parsed: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn order_key_sorts_stably() {
        let mut rows = vec![
            RemoteRow::new("1", "Sam", 90, 3),
            RemoteRow::new("2", "Alex", 150, 1),
            RemoteRow::new("3", "Maya", 90, 2),
        ];
        OrderKey::Score.sort(&mut rows);
        let ids: Vec<_> = rows.iter().map(|r| r.row_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);

        OrderKey::Timestamp.sort(&mut rows);
        let ids: Vec<_> = rows.iter().map(|r| r.row_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
    }

    #[test]
    fn read_query_format() {
        let query = ReadQuery {
            order_by: Some(OrderKey::Timestamp),
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({"orderBy": "timestamp"})
        );
    }
}
