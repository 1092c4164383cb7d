//! WebSocket support for live leaderboard updates.
//!
//! Clients subscribe to a collection and receive a full snapshot whenever
//! a row in it is created or deleted. The open socket also serves as the
//! client's connectivity signal.

mod manager;

pub use manager::{ConnectionManager, MessageSender};
pub use snakeboard_engine::protocol::{ClientMessage, ServerMessage};
