//! Connection supervisor.
//!
//! Tracks whether the remote store is reachable and runs bounded reconnect
//! attempts. State transitions:
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected
//!                               |                  |  \
//!                             fail          stream err  write err
//!                               v                  v      v
//!                            Failed          Disconnected Degraded
//! ```
//!
//! Every failed probe or write counts toward `max_connection_retries`.
//! Automatic retries stop once the budget is spent; only an explicit
//! [`ConnectionSupervisor::reconnect`] resets it.

use crate::config::SupervisorConfig;
use crate::error::RemoteError;
use crate::remote::{with_timeout, RemoteStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Reachability of the remote store as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Reachable, but a recent write failed
    Degraded,
    /// Unreachable after the last attempt
    Failed,
}

impl ConnectionState {
    /// Short status line for the game UI.
    pub fn status_text(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Online",
            ConnectionState::Degraded => "Online (limited)",
            ConnectionState::Failed => "Offline",
            ConnectionState::Disconnected => "Not connected",
        }
    }

    /// Whether remote calls are worth attempting in this state.
    pub fn allows_remote(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Degraded
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Degraded => "degraded",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Full connection status published to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Last successful exchange with the remote store
    pub last_contact: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Owns the connection state and the retry policy.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    config: SupervisorConfig,
    status: watch::Sender<ConnectionStatus>,
}

impl ConnectionSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self { config, status }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Observe status changes.
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.status.borrow().consecutive_failures
    }

    /// Whether the automatic retry budget allows another attempt.
    pub fn can_auto_retry(&self) -> bool {
        let status = self.status.borrow();
        status.state != ConnectionState::Connected
            && status.consecutive_failures < self.config.max_connection_retries
    }

    pub fn begin_attempt(&self) {
        self.transition(|status| status.state = ConnectionState::Connecting);
    }

    /// A remote call succeeded.
    pub fn record_success(&self) {
        self.transition(|status| {
            status.state = ConnectionState::Connected;
            status.last_contact = Some(Utc::now());
            status.consecutive_failures = 0;
            status.last_error = None;
        });
    }

    /// A probe or read failed: the store is treated as unreachable.
    pub fn record_failure(&self, error: &RemoteError) {
        self.transition(|status| {
            status.state = ConnectionState::Failed;
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            status.last_error = Some(error.to_string());
        });
    }

    /// A write failed after the store answered a read.
    pub fn record_degraded(&self, error: &RemoteError) {
        self.transition(|status| {
            status.state = ConnectionState::Degraded;
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            status.last_error = Some(error.to_string());
        });
    }

    /// The change stream failed or closed.
    pub fn record_stream_error(&self, error: &RemoteError) {
        self.transition(|status| {
            if status.state == ConnectionState::Connected {
                status.state = ConnectionState::Disconnected;
            }
            status.last_error = Some(error.to_string());
        });
    }

    /// Apply a reachability signal from the store.
    pub fn record_connectivity(&self, online: bool) {
        if online {
            self.record_success();
        } else {
            self.transition(|status| {
                if matches!(
                    status.state,
                    ConnectionState::Connected | ConnectionState::Degraded
                ) {
                    status.state = ConnectionState::Disconnected;
                }
            });
        }
    }

    /// Probe the store once with a read.
    pub async fn probe<R: RemoteStore>(&self, remote: &R, collection: &str) -> bool {
        self.begin_attempt();
        match with_timeout("probe", self.config.probe_timeout, remote.read(collection)).await {
            Ok(_) => {
                self.record_success();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote store probe failed");
                self.record_failure(&e);
                false
            }
        }
    }

    /// Connect, retrying with backoff until connected or the budget is spent.
    pub async fn connect<R: RemoteStore>(&self, remote: &R, collection: &str) -> ConnectionState {
        self.attempt_until_exhausted(remote, collection, false).await
    }

    /// Explicit reconnect: resets the failure count, then connects.
    pub async fn reconnect<R: RemoteStore>(&self, remote: &R, collection: &str) -> ConnectionState {
        tracing::info!("Reconnecting to remote store");
        self.transition(|status| status.consecutive_failures = 0);
        self.connect(remote, collection).await
    }

    /// Automatic retry after a failure. Does nothing once the budget is spent.
    pub async fn retry<R: RemoteStore>(&self, remote: &R, collection: &str) -> ConnectionState {
        if !self.can_auto_retry() {
            return self.state();
        }
        self.attempt_until_exhausted(remote, collection, true).await
    }

    async fn attempt_until_exhausted<R: RemoteStore>(
        &self,
        remote: &R,
        collection: &str,
        mut wait_first: bool,
    ) -> ConnectionState {
        loop {
            if wait_first {
                let delay = self.config.backoff.delay(self.consecutive_failures());
                tracing::debug!(?delay, "Waiting before reconnect attempt");
                tokio::time::sleep(delay).await;
                if self.state() == ConnectionState::Connected {
                    return ConnectionState::Connected;
                }
            }
            wait_first = true;

            if self.probe(remote, collection).await {
                tracing::info!("Connected to remote store");
                return ConnectionState::Connected;
            }
            if self.consecutive_failures() >= self.config.max_connection_retries {
                tracing::warn!(
                    failures = self.consecutive_failures(),
                    "Giving up on remote store until reconnect"
                );
                return self.state();
            }
        }
    }

    fn transition(&self, update: impl FnOnce(&mut ConnectionStatus)) {
        self.status.send_if_modified(|status| {
            let before = status.clone();
            update(status);
            if before.state != status.state {
                tracing::debug!(from = %before.state, to = %status.state, "Connection state changed");
            }
            before != *status
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backoff;
    use crate::remote::MemoryRemote;
    use std::time::Duration;

    fn supervisor() -> ConnectionSupervisor {
        ConnectionSupervisor::new(SupervisorConfig::default())
    }

    #[test]
    fn status_text() {
        assert_eq!(ConnectionState::Connecting.status_text(), "Connecting...");
        assert_eq!(ConnectionState::Connected.status_text(), "Online");
        assert_eq!(ConnectionState::Degraded.status_text(), "Online (limited)");
        assert_eq!(ConnectionState::Failed.status_text(), "Offline");
        assert_eq!(ConnectionState::Disconnected.status_text(), "Not connected");
    }

    #[test]
    fn transitions() {
        let sup = supervisor();
        assert_eq!(sup.state(), ConnectionState::Disconnected);

        sup.begin_attempt();
        assert_eq!(sup.state(), ConnectionState::Connecting);

        sup.record_success();
        assert_eq!(sup.state(), ConnectionState::Connected);
        assert!(sup.status().last_contact.is_some());

        sup.record_degraded(&RemoteError::Transport("reset".into()));
        assert_eq!(sup.state(), ConnectionState::Degraded);
        assert_eq!(sup.consecutive_failures(), 1);

        sup.record_success();
        sup.record_stream_error(&RemoteError::Unreachable("closed".into()));
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(sup.status().last_error.as_deref(), Some("remote store unreachable: closed"));
    }

    #[test]
    fn stream_error_only_disconnects_when_connected() {
        let sup = supervisor();
        sup.record_failure(&RemoteError::Unreachable("down".into()));
        sup.record_stream_error(&RemoteError::Unreachable("closed".into()));
        assert_eq!(sup.state(), ConnectionState::Failed);
    }

    #[test]
    fn connectivity_signal() {
        let sup = supervisor();
        sup.record_connectivity(true);
        assert_eq!(sup.state(), ConnectionState::Connected);
        sup.record_connectivity(false);
        assert_eq!(sup.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn watchers_see_changes() {
        let sup = supervisor();
        let mut rx = sup.watch();
        sup.record_success();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, ConnectionState::Connected);

        // No-op transitions do not notify.
        sup.record_connectivity(false);
        rx.borrow_and_update();
        sup.record_connectivity(false);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_gives_up_after_budget() {
        let remote = MemoryRemote::new();
        remote.set_online(false);
        let sup = supervisor();

        let started = tokio::time::Instant::now();
        assert_eq!(sup.connect(&remote, "scores").await, ConnectionState::Failed);
        assert_eq!(remote.calls().reads, 3);
        assert_eq!(sup.consecutive_failures(), 3);
        // Two waits between three attempts.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));

        // Budget spent: automatic retry is a no-op.
        assert_eq!(sup.retry(&remote, "scores").await, ConnectionState::Failed);
        assert_eq!(remote.calls().reads, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_resets_budget() {
        let remote = MemoryRemote::new();
        remote.set_online(false);
        let sup = supervisor();
        sup.connect(&remote, "scores").await;

        remote.set_online(true);
        assert_eq!(sup.reconnect(&remote, "scores").await, ConnectionState::Connected);
        assert_eq!(sup.consecutive_failures(), 0);
        assert_eq!(remote.calls().reads, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_when_store_returns() {
        let remote = MemoryRemote::new();
        let sup = ConnectionSupervisor::new(SupervisorConfig {
            backoff: Backoff::Fixed(Duration::from_secs(1)),
            ..SupervisorConfig::default()
        });
        sup.record_failure(&RemoteError::Unreachable("down".into()));

        assert_eq!(sup.retry(&remote, "scores").await, ConnectionState::Connected);
        assert_eq!(remote.calls().reads, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_probe_times_out() {
        let remote = MemoryRemote::new();
        remote.set_latency(Duration::from_secs(60));
        let sup = supervisor();

        assert!(!sup.probe(&remote, "scores").await);
        assert_eq!(sup.state(), ConnectionState::Failed);
        assert!(sup
            .status()
            .last_error
            .is_some_and(|e| e.contains("timed out")));
    }
}
