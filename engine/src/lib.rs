//! # Snakeboard Engine
//!
//! A deterministic leaderboard reconciliation core for an online arcade game.
//!
//! This crate provides the logic that keeps a player's locally cached best
//! score and a shared, multi-writer remote store consistent. It reduces raw
//! score rows to one personal best per player, applies new scores with a
//! "create, or improve only if strictly better" rule, plans the remote
//! mutations that rule needs, and encodes the on-device cache.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, clocks or platform
//! - **Deterministic**: Same inputs always produce same outputs
//! - **Testable**: Pure logic, no mocks needed
//! - **Portable**: Runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! - [`ScoreRecord`] - a player's score as the leaderboard shows it
//! - [`RemoteRow`] - a physical row in the remote `scores` collection; a
//!   player may own several
//! - [`PlayerName`] - trimmed, non-empty player identity
//!
//! ### Reduction
//!
//! [`reconcile::reduce`] groups records by player, keeps the maximum score
//! (first seen wins ties) and sorts descending. A [`Leaderboard`] can only be
//! built this way, so it never holds two entries for one player.
//!
//! ### Writes
//!
//! - [`reconcile::apply_candidate`] - merge a score into a leaderboard
//! - [`reconcile::plan_remote_write`] - decide whether the remote store needs
//!   a create, a delete-then-create replacement, or nothing at all
//!
//! ### Sequencing
//!
//! [`Sequenced`] values carry the number of the request that produced them,
//! so late results never overwrite newer ones.
//!
//! ## Quick Start
//!
//! ```rust
//! use snakeboard_engine::{reconcile, PlayerName, RemoteRow, ScoreRecord, SubmitOutcome};
//!
//! // 1. Reduce remote rows (a stale duplicate for Alex)
//! let rows = vec![
//!     RemoteRow::new("1", "Alex", 150, 1706745600000),
//!     RemoteRow::new("2", "Alex", 90, 1706745500000),
//!     RemoteRow::new("3", "Maya", 120, 1706745600000),
//! ];
//! let mut board = reconcile::reduce_rows(&rows);
//! assert_eq!(board.len(), 2);
//!
//! // 2. Apply a new score
//! let maya = PlayerName::parse("Maya").unwrap();
//! let candidate = ScoreRecord::new(maya.clone(), 130, 1706745700000);
//! let outcome = reconcile::apply_candidate(&mut board, &candidate);
//! assert_eq!(outcome, SubmitOutcome::Improved { previous: 120 });
//! assert_eq!(board.get(&maya).unwrap().score, 130);
//!
//! // 3. Plan the remote write for the same score
//! let plan = reconcile::plan_remote_write(&rows, &candidate);
//! assert!(plan.mutates());
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for embedding in a
//! game shell. All data is exchanged as JSON strings.
//!
//! ## Persistence
//!
//! Use [`snapshot::encode_leaderboard`] and [`snapshot::decode_leaderboard`]
//! for the device cache. The cache is a plain JSON array of
//! `{name, score, timestamp}` objects under [`LEADERBOARD_KEY`].

pub mod error;
pub mod ffi;
pub mod leaderboard;
pub mod protocol;
pub mod reconcile;
pub mod record;
pub mod sequence;
pub mod snapshot;

// Re-export main types at crate root
pub use error::Error;
pub use leaderboard::Leaderboard;
pub use protocol::{BestWrite, OrderKey, SCORES_COLLECTION};
pub use reconcile::{SubmitOutcome, WritePlan};
pub use record::{NewRow, PlayerName, RemoteRow, RowId, ScoreRecord};
pub use sequence::{SequenceCounter, Sequenced, ViewOrigin};
pub use snapshot::{LEADERBOARD_KEY, PENDING_KEY};

/// Type aliases for clarity
pub type Score = u64;
pub type Timestamp = u64;
