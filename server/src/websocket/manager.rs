//! WebSocket connection manager.
//!
//! Tracks active WebSocket connections and the collections each one is
//! subscribed to.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: String,
    /// Collections this connection receives snapshots for
    pub subscriptions: HashSet<String>,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: DashMap<String, Connection>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        let connection = Connection {
            id: conn_id.clone(),
            subscriptions: HashSet::new(),
            sender,
        };
        self.connections.insert(conn_id.clone(), connection);

        tracing::info!(conn_id = %conn_id, "WebSocket connection registered");

        conn_id
    }

    /// Unregister a connection.
    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            tracing::info!(
                conn_id = %conn_id,
                subscriptions = conn.subscriptions.len(),
                "WebSocket connection unregistered"
            );
        }
    }

    /// Start sending snapshots of `collection` to a connection.
    ///
    /// Returns `false` if the connection is gone.
    pub fn subscribe(&self, conn_id: &str, collection: &str) -> bool {
        match self.connections.get_mut(conn_id) {
            Some(mut conn) => {
                conn.subscriptions.insert(collection.to_string());
                true
            }
            None => false,
        }
    }

    /// Send a message to every connection subscribed to `collection`.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast(&self, collection: &str, message: ServerMessage) -> usize {
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            let conn = entry.value();
            if conn.subscriptions.contains(collection) && conn.sender.send(message.clone()).is_ok()
            {
                sent_count += 1;
            }
        }

        tracing::debug!(
            collection,
            recipients = sent_count,
            "Broadcast message to subscribers"
        );

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of connections subscribed to `collection`.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().subscriptions.contains(collection))
            .count()
    }
}
