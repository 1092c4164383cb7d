//! Cache encoding for persisting the leaderboard on the device.
//!
//! The cache is the bridge between the in-memory view and the device's
//! key-value storage. Its shape is a plain JSON array of
//! `{name, score, timestamp}` objects under a well-known key, so any other
//! reader of the same storage (a web page, a debugging tool) can use it
//! directly.

use crate::{error::Result, Error, Leaderboard, ScoreRecord};

/// Storage key for the cached leaderboard.
pub const LEADERBOARD_KEY: &str = "snakeLeaderboard";

/// Storage key for scores saved offline and not yet confirmed remotely.
pub const PENDING_KEY: &str = "snakePendingScores";

/// Serialize a leaderboard for the cache.
pub fn encode_leaderboard(board: &Leaderboard) -> Result<String> {
    serde_json::to_string(board).map_err(|e| Error::InvalidPayload(e.to_string()))
}

/// Deserialize a cached leaderboard.
///
/// Decoding goes through the reduction, so a hand-edited cache with repeated
/// names still yields one entry per player.
pub fn decode_leaderboard(json: &str) -> Result<Leaderboard> {
    serde_json::from_str(json).map_err(|e| Error::LocalStoreCorrupt(e.to_string()))
}

/// Serialize a list of records without reducing it.
pub fn encode_records(records: &[ScoreRecord]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| Error::InvalidPayload(e.to_string()))
}

/// Deserialize a list of records, preserving order and duplicates.
pub fn decode_records(json: &str) -> Result<Vec<ScoreRecord>> {
    serde_json::from_str(json).map_err(|e| Error::LocalStoreCorrupt(e.to_string()))
}
