//! Error types for the sync client.
//!
//! None of these reach the caller of a score submission: remote errors are
//! turned into a local fallback by the reconciler, and local store errors are
//! logged and treated as an empty cache.

use std::time::Duration;

/// Failure talking to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    #[error("remote {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid remote response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether the error means the store could not be reached at all, as
    /// opposed to a reachable store refusing or garbling a request.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            RemoteError::Unreachable(_) | RemoteError::Timeout { .. } | RemoteError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            RemoteError::Unreachable(err.to_string())
        } else if err.is_timeout() {
            RemoteError::Timeout {
                operation: "request",
                after: Duration::ZERO,
            }
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RemoteError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Io(e) => RemoteError::Unreachable(e.to_string()),
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                RemoteError::Unreachable("connection closed".to_string())
            }
            other => RemoteError::Transport(other.to_string()),
        }
    }
}

/// Failure reading or writing the device cache.
#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encoding error: {0}")]
    Encode(#[from] snakeboard_engine::Error),

    #[error("invalid cache key: {0}")]
    InvalidKey(String),
}
