//! Configuration for the sync client.

use snakeboard_engine::{Leaderboard, SCORES_COLLECTION};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Delay between automatic reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every attempt
    Fixed(Duration),
    /// `base * 2^(failures - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let shift = failures.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

/// Connection supervisor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Consecutive failures after which automatic retry stops
    pub max_connection_retries: u32,
    /// Delay between automatic attempts
    pub backoff: Backoff,
    /// Bound on a single reachability probe
    pub probe_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_connection_retries: 3,
            backoff: Backoff::Fixed(Duration::from_secs(5)),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Leaderboard reconciler settings.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Remote collection holding the score rows
    pub collection: String,
    /// Bound on every single remote read or write
    pub step_timeout: Duration,
    /// Bound on the whole remote submission path
    pub submit_timeout: Duration,
    /// Shown at cold start when the local cache is empty
    pub default_dataset: Option<Leaderboard>,
    pub supervisor: SupervisorConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            collection: SCORES_COLLECTION.to_string(),
            step_timeout: Duration::from_secs(8),
            submit_timeout: Duration::from_secs(15),
            default_dataset: None,
            supervisor: SupervisorConfig::default(),
        }
    }
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote store service
    pub remote_url: String,
    /// Directory holding the device cache
    pub cache_dir: PathBuf,
    pub reconciler: ReconcilerConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let remote_url =
            env::var("SNAKEBOARD_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        if !(remote_url.starts_with("http://") || remote_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(remote_url));
        }

        let cache_dir = env::var("SNAKEBOARD_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".snakeboard"));

        let defaults = ReconcilerConfig::default();
        let step_timeout = millis_var("SNAKEBOARD_STEP_TIMEOUT_MS", defaults.step_timeout)?;
        let submit_timeout = millis_var("SNAKEBOARD_SUBMIT_TIMEOUT_MS", defaults.submit_timeout)?;

        let max_connection_retries = match env::var("SNAKEBOARD_MAX_RETRIES") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
                var: "SNAKEBOARD_MAX_RETRIES",
                value,
            })?,
            Err(_) => defaults.supervisor.max_connection_retries,
        };

        let backoff = Backoff::Fixed(millis_var(
            "SNAKEBOARD_RETRY_BACKOFF_MS",
            Duration::from_secs(5),
        )?);

        Ok(Self {
            remote_url,
            cache_dir,
            reconciler: ReconcilerConfig {
                step_timeout,
                submit_timeout,
                supervisor: SupervisorConfig {
                    max_connection_retries,
                    backoff,
                    ..defaults.supervisor.clone()
                },
                ..defaults
            },
        })
    }
}

fn millis_var(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("SNAKEBOARD_URL must be an http(s) URL, got {0}")]
    InvalidUrl(String),
}
