//! # Snakeboard Client
//!
//! Offline-first leaderboard sync for the Snakeboard game.
//!
//! The [`Reconciler`] owns the published leaderboard view. Scores go to the
//! remote store when it is reachable and to the device cache when it is not;
//! cached scores are pushed once the connection returns. The
//! [`ConnectionSupervisor`] tracks reachability and bounds automatic
//! reconnects.
//!
//! ```no_run
//! use snakeboard_client::{FileKv, HttpRemote, Reconciler, ReconcilerConfig};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = HttpRemote::new("http://127.0.0.1:3000", Duration::from_secs(8))?;
//! let cache = FileKv::open(".snakeboard")?;
//! let reconciler = Reconciler::new(remote, cache, ReconcilerConfig::default());
//!
//! reconciler.start().await;
//! let result = reconciler.on_game_over("Maya", 130).await?;
//! println!("{}", result.message());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod local;
pub mod reconciler;
pub mod remote;
pub mod supervisor;

pub use config::{Backoff, ClientConfig, ConfigError, ReconcilerConfig, SupervisorConfig};
pub use error::{LocalStoreError, RemoteError};
pub use local::{FileKv, KeyValueStore, LocalStore, MemoryKv};
pub use reconciler::{LeaderboardView, Reconciler, SubmitResult, Subscription};
pub use remote::{HttpRemote, MemoryRemote, RemoteStore, SubscribeOptions};
pub use supervisor::{ConnectionState, ConnectionStatus, ConnectionSupervisor};
