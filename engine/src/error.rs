//! Error types for the Snakeboard engine.

use thiserror::Error;

/// All possible errors from the Snakeboard engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("player name must not be empty")]
    EmptyPlayerName,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Persistence errors
    #[error("local leaderboard cache is corrupt: {0}")]
    LocalStoreCorrupt(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::EmptyPlayerName;
        assert_eq!(err.to_string(), "player name must not be empty");

        let err = Error::LocalStoreCorrupt("expected array".into());
        assert_eq!(
            err.to_string(),
            "local leaderboard cache is corrupt: expected array"
        );

        let err = Error::InvalidPayload("missing field `score`".into());
        assert_eq!(err.to_string(), "invalid payload: missing field `score`");
    }
}
