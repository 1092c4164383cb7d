//! Remote store backed by the snakeboard server.
//!
//! Rows are read and written over the HTTP API; change notifications and the
//! connectivity signal come over the WebSocket endpoint.

use super::{ChangeStream, ConnectivityStream, RemoteStore, SubscribeOptions};
use crate::error::RemoteError;
use futures::stream::{self, StreamExt};
use futures::SinkExt;
use reqwest::{Response, StatusCode};
use snakeboard_engine::protocol::{
    ClientMessage, CreateRowResponse, ErrorBody, ReadQuery, ServerMessage,
};
use snakeboard_engine::{BestWrite, NewRow, OrderKey, RemoteRow, RowId};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// HTTP + WebSocket client for the snakeboard server.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    ws_url: String,
}

impl HttpRemote {
    /// Create a client for a server at `base_url` (`http://` or `https://`).
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let ws_url = if let Some(rest) = base_url.strip_prefix("https://") {
            format!("wss://{rest}/ws")
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            format!("ws://{rest}/ws")
        } else {
            return Err(RemoteError::Transport(format!(
                "unsupported server url: {base_url}"
            )));
        };

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            ws_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rows_url(&self, collection: &str) -> String {
        format!("{}/collections/{}/rows", self.base_url, collection)
    }

    async fn fetch_rows(
        &self,
        collection: &str,
        query: ReadQuery,
    ) -> Result<Vec<RemoteRow>, RemoteError> {
        let response = self
            .client
            .get(self.rows_url(collection))
            .query(&query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Open the socket and subscribe to `collection`.
    async fn open(&self, collection: &str, once: bool) -> Result<Socket, RemoteError> {
        let (mut socket, _) = connect_async(self.ws_url.as_str()).await?;
        let subscribe = ClientMessage::Subscribe {
            collection: collection.to_string(),
            once,
        };
        let text =
            serde_json::to_string(&subscribe).map_err(|e| RemoteError::Decode(e.to_string()))?;
        socket.send(Message::Text(text)).await?;
        Ok(socket)
    }
}

/// Turn non-success responses into [`RemoteError::Rejected`].
async fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Read server messages until the next snapshot of `collection`.
///
/// Returns `None` once the socket is closed.
async fn next_snapshot(
    socket: &mut Socket,
    collection: &str,
) -> Option<Result<Vec<RemoteRow>, RemoteError>> {
    loop {
        let message = match socket.next().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(e.into())),
        };
        match message {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::Snapshot { collection: c, rows }) if c == collection => {
                    return Some(Ok(rows))
                }
                Ok(ServerMessage::Error { message }) => {
                    return Some(Err(RemoteError::Rejected {
                        status: 0,
                        message,
                    }))
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(RemoteError::Decode(e.to_string()))),
            },
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

impl RemoteStore for HttpRemote {
    async fn read(&self, collection: &str) -> Result<Vec<RemoteRow>, RemoteError> {
        self.fetch_rows(collection, ReadQuery::default()).await
    }

    async fn read_ordered(
        &self,
        collection: &str,
        order: OrderKey,
    ) -> Result<Vec<RemoteRow>, RemoteError> {
        self.fetch_rows(
            collection,
            ReadQuery {
                order_by: Some(order),
            },
        )
        .await
    }

    async fn subscribe(
        &self,
        collection: &str,
        options: SubscribeOptions,
    ) -> Result<ChangeStream, RemoteError> {
        let socket = self.open(collection, options.once).await?;
        tracing::debug!(url = %self.ws_url, collection, "Subscribed to remote changes");

        let collection = collection.to_string();
        // The stream ends after the first error; callers resubscribe.
        let changes = stream::unfold(Some(socket), move |socket| {
            let collection = collection.clone();
            async move {
                let mut socket = socket?;
                match next_snapshot(&mut socket, &collection).await? {
                    Ok(rows) => Some((Ok(rows), Some(socket))),
                    Err(e) => Some((Err(e), None)),
                }
            }
        });

        if options.once {
            Ok(changes.take(1).boxed())
        } else {
            Ok(changes.boxed())
        }
    }

    async fn create(&self, collection: &str, row: NewRow) -> Result<RowId, RemoteError> {
        let response = self
            .client
            .post(self.rows_url(collection))
            .json(&row)
            .send()
            .await?;
        let created: CreateRowResponse = check(response).await?.json().await?;
        Ok(created.row_id)
    }

    async fn delete(&self, collection: &str, id: &RowId) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.rows_url(collection), id);
        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    async fn connectivity(&self) -> Result<ConnectivityStream, RemoteError> {
        let (socket, _) = connect_async(self.ws_url.as_str()).await?;

        // Yields `true` on the server greeting and a final `false` when the
        // socket goes away.
        let signal = stream::unfold(Some(socket), |socket| async move {
            let mut socket = socket?;
            loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(ServerMessage::Connected) = serde_json::from_str(&text) {
                            return Some((true, Some(socket)));
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        return Some((false, None));
                    }
                    Some(Ok(_)) => {}
                }
            }
        });
        Ok(signal.boxed())
    }

    async fn submit_best(
        &self,
        collection: &str,
        row: NewRow,
    ) -> Result<Option<BestWrite>, RemoteError> {
        let url = format!("{}/collections/{}/best", self.base_url, collection);
        let response = self.client.post(url).json(&row).send().await?;
        // Servers without the endpoint fall back to the two-step write.
        if response.status() == StatusCode::NOT_FOUND
            || response.status() == StatusCode::METHOD_NOT_ALLOWED
        {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }
}
