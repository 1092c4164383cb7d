//! Record types for scores, both as the merged view sees them and as the
//! remote store physically holds them.

use crate::{error::Result, Error, Score, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated player name: trimmed and never empty.
///
/// Identity of a [`ScoreRecord`] is its player name, so every path that
/// accepts user or remote input goes through [`PlayerName::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    /// Trim and validate a raw name.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyPlayerName);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlayerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<PlayerName> for String {
    fn from(name: PlayerName) -> Self {
        name.0
    }
}

impl PartialEq<str> for PlayerName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PlayerName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One player's score as shown on the leaderboard and persisted in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// Player identity
    pub name: PlayerName,
    /// Non-negative score
    pub score: Score,
    /// When the score was recorded (milliseconds since epoch, 0 if unknown)
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl ScoreRecord {
    /// Create a new record.
    pub fn new(name: PlayerName, score: Score, timestamp: Timestamp) -> Self {
        Self {
            name,
            score,
            timestamp,
        }
    }

    /// Build the row a client would ask the remote store to create.
    pub fn to_new_row(&self) -> NewRow {
        NewRow {
            player_name: self.name.clone(),
            score: self.score,
            timestamp: self.timestamp,
        }
    }
}

/// Opaque, store-assigned row identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical row in the remote `scores` collection.
///
/// Writes are append-only, so a player may own several rows. The player
/// name is kept raw here: rows come from other writers and are validated
/// when they are reduced, not when they are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRow {
    /// Store-assigned identifier
    pub row_id: RowId,
    /// Player name as written by the remote writer
    pub player_name: String,
    /// Score held by this row
    pub score: Score,
    /// Write time reported by the writer
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl RemoteRow {
    /// Create a remote row.
    pub fn new(
        row_id: impl Into<String>,
        player_name: impl Into<String>,
        score: Score,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            row_id: RowId::new(row_id),
            player_name: player_name.into(),
            score,
            timestamp,
        }
    }

    /// Convert to a leaderboard record, or `None` if the name is invalid.
    pub fn to_record(&self) -> Option<ScoreRecord> {
        let name = PlayerName::parse(&self.player_name).ok()?;
        Some(ScoreRecord::new(name, self.score, self.timestamp))
    }

    /// Whether this row belongs to the given player.
    pub fn belongs_to(&self, name: &PlayerName) -> bool {
        self.player_name.trim() == name.as_str()
    }
}

/// A row as submitted for creation, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRow {
    pub player_name: PlayerName,
    pub score: Score,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl NewRow {
    /// Attach a store-assigned id.
    pub fn into_row(self, row_id: RowId) -> RemoteRow {
        RemoteRow {
            row_id,
            player_name: self.player_name.into(),
            score: self.score,
            timestamp: self.timestamp,
        }
    }

    /// The leaderboard record this row represents.
    pub fn to_record(&self) -> ScoreRecord {
        ScoreRecord::new(self.player_name.clone(), self.score, self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_name_is_trimmed() {
        let name = PlayerName::parse("  Alex \n").unwrap();
        assert_eq!(name.as_str(), "Alex");
        assert_eq!(name, "Alex");
    }

    #[test]
    fn empty_player_name_rejected() {
        assert_eq!(PlayerName::parse(""), Err(Error::EmptyPlayerName));
        assert_eq!(PlayerName::parse("   \t"), Err(Error::EmptyPlayerName));
    }

    #[test]
    fn player_name_deserialization_validates() {
        let ok: PlayerName = serde_json::from_str(r#"" Maya ""#).unwrap();
        assert_eq!(ok, "Maya");

        let err = serde_json::from_str::<PlayerName>(r#""  ""#);
        assert!(err.is_err());
    }

    #[test]
    fn score_record_serialization_format() {
        let record = ScoreRecord::new(PlayerName::parse("Sam").unwrap(), 90, 1000);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Sam", "score": 90, "timestamp": 1000})
        );
    }

    #[test]
    fn score_record_missing_timestamp_defaults() {
        let record: ScoreRecord = serde_json::from_str(r#"{"name":"Sam","score":90}"#).unwrap();
        assert_eq!(record.timestamp, 0);
    }

    #[test]
    fn remote_row_with_blank_name_is_not_a_record() {
        let row = RemoteRow::new("1", "   ", 10, 0);
        assert!(row.to_record().is_none());

        let row = RemoteRow::new("2", " Alex", 10, 0);
        assert_eq!(row.to_record().unwrap().name, "Alex");
    }

    #[test]
    fn remote_row_ownership_ignores_padding() {
        let alex = PlayerName::parse("Alex").unwrap();
        assert!(RemoteRow::new("1", "Alex ", 10, 0).belongs_to(&alex));
        assert!(!RemoteRow::new("2", "Alexa", 10, 0).belongs_to(&alex));
    }

    #[test]
    fn remote_row_wire_format() {
        let row = RemoteRow::new("abc", "Alex", 150, 42);
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("rowId")); // camelCase
        assert!(json.contains("playerName"));

        let parsed: RemoteRow = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, row);
    }

    #[test]
    fn new_row_into_row() {
        let new_row = NewRow {
            player_name: PlayerName::parse("Maya").unwrap(),
            score: 130,
            timestamp: 7,
        };
        let row = new_row.into_row(RowId::new("r-1"));
        assert_eq!(row.row_id.as_str(), "r-1");
        assert_eq!(row.player_name, "Maya");
        assert_eq!(row.score, 130);
    }
}
