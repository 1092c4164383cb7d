//! WebSocket handler for live leaderboard updates.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::db;
use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};

use super::ensure_collection;

/// Serve one socket until the client leaves.
///
/// Replies and broadcasts both go through the connection's channel, so a
/// single writer task owns the sink.
pub async fn handle_websocket_connection(
    socket: WebSocket,
    pool: PgPool,
    conn_manager: Arc<ConnectionManager>,
) {
    let (sink, mut frames) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(tx);
    let writer = tokio::spawn(write_frames(sink, rx));
    conn_manager.send_to(&conn_id, ServerMessage::Connected);
    tracing::info!(conn_id = %conn_id, "Leaderboard socket opened");

    while let Some(frame) = frames.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(reason)) => {
                tracing::debug!(conn_id = %conn_id, ?reason, "Client closed socket");
                break;
            }
            Ok(other) => {
                tracing::trace!(conn_id = %conn_id, ?other, "Ignoring non-text frame");
                continue;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, error = %e, "Socket read failed");
                break;
            }
        };
        let reply = process_message(text.as_str(), &pool, &conn_manager, &conn_id).await;
        conn_manager.send_to(&conn_id, reply);
    }

    conn_manager.unregister(&conn_id);
    writer.abort();
    tracing::info!(
        conn_id = %conn_id,
        remaining = conn_manager.connection_count(),
        "Leaderboard socket closed"
    );
}

/// Encode queued messages as JSON text frames until the channel or the
/// socket closes.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut outgoing: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = outgoing.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Could not encode server message");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!(error = %e, "Socket write failed; stopping writer");
            return;
        }
    }
}

/// Process a client message and return the reply.
async fn process_message(
    text: &str,
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    conn_id: &str,
) -> ServerMessage {
    let request = match serde_json::from_str::<ClientMessage>(text) {
        Ok(request) => request,
        Err(e) => return ServerMessage::error(format!("Invalid message format: {e}")),
    };

    match request {
        ClientMessage::Subscribe { collection, once } => {
            if let Err(e) = ensure_collection(&collection) {
                return ServerMessage::error(e.to_string());
            }
            // Subscribe before reading: a change in between arrives twice, never zero times.
            if !once {
                conn_manager.subscribe(conn_id, &collection);
            }
            match db::list_rows(pool, &collection, None).await {
                Ok(rows) => {
                    tracing::debug!(
                        conn_id,
                        collection = %collection,
                        once,
                        rows = rows.len(),
                        "Snapshot sent"
                    );
                    ServerMessage::snapshot(collection, rows)
                }
                Err(e) => {
                    tracing::error!("Database error while reading snapshot: {:?}", e);
                    ServerMessage::error("Database error")
                }
            }
        }

        ClientMessage::Ping => ServerMessage::Pong,
    }
}
